use std::fmt;

use fxhash::FxHashMap;

use crate::error::Result;
use crate::expr::Expr;

/// Role of a pin in a gate type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinDirection {
    /// Driven by a fan-in net
    Input,
    /// Drives a fan-out net
    Output,
    /// Only used inside the definition of the gate type
    Internal,
}

/// Capability of a gate type, queried by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateProperty {
    /// Purely combinational logic
    Combinational,
    /// Stateful element such as a flip-flop or latch
    Sequential,
    /// Constant-one source
    Power,
    /// Constant-zero source
    Ground,
    /// Lookup table, whose function comes from its init value
    Lut,
    /// Buffer
    Buffer,
    /// Inverter
    Inverter,
    /// Multiplexer
    Mux,
}

impl GateProperty {
    const ALL: [GateProperty; 8] = [
        GateProperty::Combinational,
        GateProperty::Sequential,
        GateProperty::Power,
        GateProperty::Ground,
        GateProperty::Lut,
        GateProperty::Buffer,
        GateProperty::Inverter,
        GateProperty::Mux,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of capabilities of a gate type
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GateProperties(u16);

impl GateProperties {
    /// Create a set from a list of properties
    pub fn of(props: &[GateProperty]) -> GateProperties {
        props.iter().copied().collect()
    }

    /// Returns true if the property is in the set
    pub fn contains(&self, prop: GateProperty) -> bool {
        self.0 & prop.bit() != 0
    }

    /// Add a property to the set
    pub fn insert(&mut self, prop: GateProperty) {
        self.0 |= prop.bit();
    }

    /// Iterate over the properties in the set
    pub fn iter(&self) -> impl Iterator<Item = GateProperty> + '_ {
        GateProperty::ALL
            .into_iter()
            .filter(move |p| self.contains(*p))
    }

    /// Returns true if the set is empty
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<GateProperty> for GateProperties {
    fn from_iter<I: IntoIterator<Item = GateProperty>>(iter: I) -> Self {
        let mut ret = GateProperties::default();
        for p in iter {
            ret.insert(p);
        }
        ret
    }
}

impl fmt::Debug for GateProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A logic cell type: named pins, the symbolic function of each output or internal pin, and
/// its capabilities
///
/// Functions are expressed over the pin names of the type. An output pin may refer to internal
/// pins, which are expanded when a gate function is resolved.
#[derive(Debug, Clone)]
pub struct GateType {
    name: String,
    pins: Vec<(String, PinDirection)>,
    functions: FxHashMap<String, Expr>,
    properties: GateProperties,
}

impl GateType {
    /// Create a gate type without pins
    pub fn new(name: &str, properties: GateProperties) -> GateType {
        GateType {
            name: name.to_string(),
            pins: Vec::new(),
            functions: FxHashMap::default(),
            properties,
        }
    }

    /// Add a pin
    pub fn with_pin(mut self, pin: &str, direction: PinDirection) -> GateType {
        assert!(
            self.pin_direction(pin).is_none(),
            "Pin {pin} declared twice on {}",
            self.name
        );
        self.pins.push((pin.to_string(), direction));
        self
    }

    /// Add several pins with the same direction
    pub fn with_pins(self, pins: &[&str], direction: PinDirection) -> GateType {
        pins.iter()
            .fold(self, |t, p| t.with_pin(p, direction))
    }

    /// Declare the function of a pin
    pub fn with_function(mut self, pin: &str, function: Expr) -> GateType {
        self.functions.insert(pin.to_string(), function);
        self
    }

    /// Declare the function of a pin from its textual form
    pub fn with_function_str(self, pin: &str, function: &str) -> Result<GateType> {
        let f = Expr::parse(function)?;
        Ok(self.with_function(pin, f))
    }

    /// Name of the type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capabilities of the type
    pub fn properties(&self) -> GateProperties {
        self.properties
    }

    /// Returns true if the type has this capability
    pub fn has_property(&self, prop: GateProperty) -> bool {
        self.properties.contains(prop)
    }

    /// All pins, in declaration order
    pub fn pins(&self) -> impl Iterator<Item = (&str, PinDirection)> + '_ {
        self.pins.iter().map(|(p, d)| (p.as_str(), *d))
    }

    /// Pins with the given direction, in declaration order
    pub fn pins_with_direction(&self, direction: PinDirection) -> Vec<&str> {
        self.pins()
            .filter(|(_, d)| *d == direction)
            .map(|(p, _)| p)
            .collect()
    }

    /// Input pins, in declaration order
    pub fn input_pins(&self) -> Vec<&str> {
        self.pins_with_direction(PinDirection::Input)
    }

    /// Output pins, in declaration order
    pub fn output_pins(&self) -> Vec<&str> {
        self.pins_with_direction(PinDirection::Output)
    }

    /// Direction of a pin, if it exists
    pub fn pin_direction(&self, pin: &str) -> Option<PinDirection> {
        self.pins.iter().find(|(p, _)| p == pin).map(|(_, d)| *d)
    }

    /// Declared function of a pin, if any
    pub fn function(&self, pin: &str) -> Option<&Expr> {
        self.functions.get(pin)
    }
}
