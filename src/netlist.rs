//! Gate-level netlists: gate types, gates, nets, and a small standard cell library

mod gate_type;
pub mod generators;
mod library;
mod netlist;

pub use gate_type::{GateProperties, GateProperty, GateType, PinDirection};
pub use library::GateLibrary;
pub use netlist::{Endpoint, Gate, GateId, Net, NetId, Netlist};
