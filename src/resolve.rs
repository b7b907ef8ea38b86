//! Resolution of gate pin functions
//!
//! The declared function of an output pin may refer to other pins of the same gate type.
//! Resolving it expands internal and output pins, and replaces input pins by the variables of
//! their fan-in nets. The result only depends on the gate instance and the pin, so it can be
//! cached independently of the subgraph being compiled.

use fxhash::FxHashMap;

use crate::codec;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::netlist::{Gate, GateId, Netlist, PinDirection};

/// Write-once cache of resolved gate pin functions
///
/// It is created by the caller and may be reused across compilations, including with different
/// subgraphs.
#[derive(Debug, Clone, Default)]
pub struct GateFunctionCache {
    entries: FxHashMap<GateId, FxHashMap<String, Expr>>,
    hits: usize,
    resolutions: usize,
}

impl GateFunctionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached functions
    pub fn len(&self) -> usize {
        self.entries.values().map(|m| m.len()).sum()
    }

    /// Returns true if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups answered from the cache
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Number of functions actually resolved
    pub fn resolutions(&self) -> usize {
        self.resolutions
    }

    /// Cached function of a gate pin, if any
    pub fn get(&self, gate: GateId, pin: &str) -> Option<&Expr> {
        self.entries.get(&gate).and_then(|m| m.get(pin))
    }

    /// Resolved function of a gate pin, over the variables of the gate's fan-in nets
    pub fn resolve(&mut self, netlist: &Netlist, gate: GateId, pin: &str) -> Result<Expr> {
        if let Some(f) = self.get(gate, pin) {
            let f = f.clone();
            self.hits += 1;
            return Ok(f);
        }
        let f = resolve_gate_function(netlist.gate(gate)?, pin)?;
        self.resolutions += 1;
        log::trace!("resolved pin {pin} of gate {gate}: {f}");
        let previous = self
            .entries
            .entry(gate)
            .or_default()
            .insert(pin.to_string(), f.clone());
        debug_assert!(previous.is_none());
        Ok(f)
    }
}

/// Resolve the function of a pin without caching
pub fn resolve_gate_function(gate: &Gate, pin: &str) -> Result<Expr> {
    let f = pin_function(gate, pin)?;
    let mut on_stack = vec![pin.to_string()];
    let ret = expand_pins(gate, &f, &mut on_stack)?;
    Ok(ret.simplify())
}

fn malformed(gate: &Gate, reason: String) -> Error {
    Error::MalformedGateType {
        gate_type: gate.gate_type().name().to_string(),
        reason,
    }
}

fn pin_function(gate: &Gate, pin: &str) -> Result<Expr> {
    match gate.gate_type().pin_direction(pin) {
        Some(PinDirection::Output) | Some(PinDirection::Internal) => (),
        Some(PinDirection::Input) => {
            return Err(malformed(gate, format!("pin {pin} is an input")));
        }
        None => return Err(malformed(gate, format!("no pin {pin}"))),
    }
    gate.boolean_function(pin)
        .ok_or_else(|| malformed(gate, format!("no function for pin {pin}")))
}

/// Substitute the pins used by a function; `on_stack` holds the pins being expanded
fn expand_pins(gate: &Gate, f: &Expr, on_stack: &mut Vec<String>) -> Result<Expr> {
    let mut bindings = FxHashMap::default();
    for v in f.free_variables() {
        match gate.gate_type().pin_direction(&v) {
            None => {
                let current = on_stack.last().map(String::as_str).unwrap_or_default();
                return Err(malformed(
                    gate,
                    format!("function of pin {current} uses unknown pin {v}"),
                ));
            }
            Some(PinDirection::Input) => {
                let net = gate.fan_in_net(&v).ok_or_else(|| Error::UnconnectedPin {
                    gate: gate.id(),
                    pin: v.clone(),
                })?;
                let name = codec::encode(net);
                bindings.insert(v, Expr::bit(&name));
            }
            Some(PinDirection::Output) | Some(PinDirection::Internal) => {
                if on_stack.contains(&v) {
                    return Err(malformed(gate, format!("pin {v} depends on itself")));
                }
                let sub = pin_function(gate, &v)?;
                on_stack.push(v.clone());
                let e = expand_pins(gate, &sub, on_stack)?;
                on_stack.pop();
                bindings.insert(v, e);
            }
        }
    }
    f.substitute(&bindings)
}
