use std::fmt;
use std::sync::Arc;

use fxhash::{FxHashMap, FxHashSet};
use volute::Lut;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::netlist::gate_type::{GateProperty, GateType, PinDirection};

/// Identifier of a net, assigned sequentially at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(u32);

/// Identifier of a gate, assigned sequentially at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GateId(u32);

impl NetId {
    /// Build an id from its integer value
    pub fn from_raw(id: u32) -> NetId {
        NetId(id)
    }

    /// Integer value of the id
    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl GateId {
    /// Build an id from its integer value
    pub fn from_raw(id: u32) -> GateId {
        GateId(id)
    }

    /// Integer value of the id
    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// A pin of a gate instance, at one end of a net
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Gate owning the pin
    pub gate: GateId,
    /// Name of the pin in the gate type
    pub pin: String,
}

/// A wire
#[derive(Debug, Clone)]
pub struct Net {
    id: NetId,
    name: String,
    sources: Vec<Endpoint>,
    destinations: Vec<Endpoint>,
}

impl Net {
    /// Id of the net
    pub fn id(&self) -> NetId {
        self.id
    }

    /// Name of the net
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Driving endpoints; a well-formed net has at most one
    pub fn sources(&self) -> &[Endpoint] {
        &self.sources
    }

    /// Endpoints reading the net
    pub fn destinations(&self) -> &[Endpoint] {
        &self.destinations
    }
}

/// An instance of a gate type
#[derive(Debug, Clone)]
pub struct Gate {
    id: GateId,
    name: String,
    gate_type: Arc<GateType>,
    fan_in: FxHashMap<String, NetId>,
    fan_out: FxHashMap<String, NetId>,
    lut_init: Option<Lut>,
}

impl Gate {
    /// Id of the gate
    pub fn id(&self) -> GateId {
        self.id
    }

    /// Name of the gate
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type of the gate
    pub fn gate_type(&self) -> &GateType {
        &self.gate_type
    }

    /// Returns true if the type of the gate has this capability
    pub fn has_property(&self, prop: GateProperty) -> bool {
        self.gate_type.has_property(prop)
    }

    /// Net connected to an input pin
    pub fn fan_in_net(&self, pin: &str) -> Option<NetId> {
        self.fan_in.get(pin).copied()
    }

    /// Net connected to an output pin
    pub fn fan_out_net(&self, pin: &str) -> Option<NetId> {
        self.fan_out.get(pin).copied()
    }

    /// Init value of a LUT gate
    pub fn lut_init(&self) -> Option<&Lut> {
        self.lut_init.as_ref()
    }

    /// Symbolic function of a pin, over the pin names of the gate type
    ///
    /// For a LUT gate, the function of the output pin is derived from its init value.
    pub fn boolean_function(&self, pin: &str) -> Option<Expr> {
        if let Some(lut) = &self.lut_init {
            if self.gate_type.pin_direction(pin) == Some(PinDirection::Output) {
                return Some(lut_function(lut, &self.gate_type.input_pins()));
            }
        }
        self.gate_type.function(pin).cloned()
    }
}

/// Shannon expansion of a truth table; input `i` of the table is `inputs[i]`
fn lut_function(lut: &Lut, inputs: &[&str]) -> Expr {
    fn expand(lut: &Lut, inputs: &[&str], var: usize, mask: usize) -> Expr {
        if var == 0 {
            return if lut.value(mask) {
                Expr::one()
            } else {
                Expr::zero()
            };
        }
        let v = var - 1;
        let f0 = expand(lut, inputs, v, mask);
        let f1 = expand(lut, inputs, v, mask | (1 << v));
        if f0 == f1 {
            return f0;
        }
        let x = Expr::bit(inputs[v]);
        ((&x & &f1) | (&!&x & &f0)).simplify()
    }
    expand(lut, inputs, lut.num_vars(), 0)
}

/// A gate-level netlist
///
/// Gates and nets are only ever added. Ids are indices, so a net id is smaller than
/// [`Netlist::nb_nets`].
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    nets: Vec<Net>,
    gates: Vec<Gate>,
}

impl Netlist {
    /// Create an empty netlist
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of nets
    pub fn nb_nets(&self) -> usize {
        self.nets.len()
    }

    /// Return the number of gates
    pub fn nb_gates(&self) -> usize {
        self.gates.len()
    }

    /// Largest net id, if there is any net
    pub fn max_net_id(&self) -> Option<NetId> {
        self.nets.last().map(|n| n.id)
    }

    /// Get a net
    pub fn net(&self, id: NetId) -> Result<&Net> {
        self.nets
            .get(id.index())
            .ok_or_else(|| Error::NullReference(format!("net {id}")))
    }

    /// Get a gate
    pub fn gate(&self, id: GateId) -> Result<&Gate> {
        self.gates
            .get(id.index())
            .ok_or_else(|| Error::NullReference(format!("gate {id}")))
    }

    /// All nets, by increasing id
    pub fn nets(&self) -> impl Iterator<Item = &Net> + '_ {
        self.nets.iter()
    }

    /// All gates, by increasing id
    pub fn gates(&self) -> impl Iterator<Item = &Gate> + '_ {
        self.gates.iter()
    }

    /// Look a net up by name
    pub fn net_by_name(&self, name: &str) -> Option<NetId> {
        self.nets.iter().find(|n| n.name == name).map(|n| n.id)
    }

    /// Look a gate up by name
    pub fn gate_by_name(&self, name: &str) -> Option<GateId> {
        self.gates.iter().find(|g| g.name == name).map(|g| g.id)
    }

    /// Create a new unconnected net
    pub fn create_net(&mut self, name: &str) -> NetId {
        let id = NetId(self.nets.len() as u32);
        self.nets.push(Net {
            id,
            name: name.to_string(),
            sources: Vec::new(),
            destinations: Vec::new(),
        });
        id
    }

    /// Create a new unconnected gate
    pub fn create_gate(&mut self, gate_type: &Arc<GateType>, name: &str) -> GateId {
        let id = GateId(self.gates.len() as u32);
        self.gates.push(Gate {
            id,
            name: name.to_string(),
            gate_type: gate_type.clone(),
            fan_in: FxHashMap::default(),
            fan_out: FxHashMap::default(),
            lut_init: None,
        });
        id
    }

    /// Create a new LUT gate with its init value
    ///
    /// The type must be a LUT type with as many input pins as the table has variables.
    pub fn create_lut(
        &mut self,
        gate_type: &Arc<GateType>,
        name: &str,
        init: Lut,
    ) -> Result<GateId> {
        if !gate_type.has_property(GateProperty::Lut) {
            return Err(Error::InvalidConnection(format!(
                "gate type {} is not a LUT",
                gate_type.name()
            )));
        }
        let nb_inputs = gate_type.input_pins().len();
        if init.num_vars() != nb_inputs {
            return Err(Error::InvalidConnection(format!(
                "{}-input table for {nb_inputs}-input gate type {}",
                init.num_vars(),
                gate_type.name()
            )));
        }
        let id = self.create_gate(gate_type, name);
        self.gates[id.index()].lut_init = Some(init);
        Ok(id)
    }

    fn check_pin(
        &self,
        gate_type: &GateType,
        pin: &str,
        net: NetId,
        direction: PinDirection,
    ) -> Result<()> {
        self.net(net)?;
        match gate_type.pin_direction(pin) {
            Some(d) if d == direction => Ok(()),
            Some(d) => Err(Error::InvalidConnection(format!(
                "pin {pin} of gate type {} is {d:?}, not {direction:?}",
                gate_type.name()
            ))),
            None => Err(Error::InvalidConnection(format!(
                "gate type {} has no pin {pin}",
                gate_type.name()
            ))),
        }
    }

    /// Connect a net to an input pin of a gate
    pub fn connect_input(&mut self, gate: GateId, pin: &str, net: NetId) -> Result<()> {
        self.check_pin(&self.gate(gate)?.gate_type, pin, net, PinDirection::Input)?;
        let g = &mut self.gates[gate.index()];
        if g.fan_in.contains_key(pin) {
            return Err(Error::InvalidConnection(format!(
                "input pin {pin} of gate {gate} is already connected"
            )));
        }
        g.fan_in.insert(pin.to_string(), net);
        self.nets[net.index()].destinations.push(Endpoint {
            gate,
            pin: pin.to_string(),
        });
        Ok(())
    }

    /// Connect an output pin of a gate to a net
    ///
    /// Several outputs may drive the same net: this is representable, but rejected by
    /// the compiler.
    pub fn connect_output(&mut self, gate: GateId, pin: &str, net: NetId) -> Result<()> {
        self.check_pin(&self.gate(gate)?.gate_type, pin, net, PinDirection::Output)?;
        let g = &mut self.gates[gate.index()];
        if g.fan_out.contains_key(pin) {
            return Err(Error::InvalidConnection(format!(
                "output pin {pin} of gate {gate} is already connected"
            )));
        }
        g.fan_out.insert(pin.to_string(), net);
        self.nets[net.index()].sources.push(Endpoint {
            gate,
            pin: pin.to_string(),
        });
        Ok(())
    }

    /// Create a gate and connect its pins in one go
    ///
    /// All connections are checked first: on error, the netlist is left unchanged.
    pub fn instantiate(
        &mut self,
        gate_type: &Arc<GateType>,
        name: &str,
        inputs: &[(&str, NetId)],
        outputs: &[(&str, NetId)],
    ) -> Result<GateId> {
        let mut connected = FxHashSet::default();
        let pins = inputs
            .iter()
            .map(|c| (c, PinDirection::Input))
            .chain(outputs.iter().map(|c| (c, PinDirection::Output)));
        for ((pin, net), direction) in pins {
            self.check_pin(gate_type, pin, *net, direction)?;
            if !connected.insert(*pin) {
                return Err(Error::InvalidConnection(format!(
                    "pin {pin} of gate {name} is connected twice"
                )));
            }
        }
        let g = self.create_gate(gate_type, name);
        for (pin, net) in inputs {
            self.connect_input(g, pin, *net)?;
        }
        for (pin, net) in outputs {
            self.connect_output(g, pin, *net)?;
        }
        Ok(g)
    }
}
