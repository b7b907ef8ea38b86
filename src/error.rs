//! Error type shared by the whole crate

use thiserror::Error;

use crate::netlist::{GateId, NetId};

/// Errors raised while building netlists or compiling subgraph functions
///
/// All of them are deterministic: retrying the same call gives the same error.
#[derive(Debug, Error)]
pub enum Error {
    /// An explicit subgraph was given without any gate
    #[error("subgraph contains no gates")]
    EmptySubgraph,

    /// A gate or net id does not exist in the netlist
    #[error("{0} does not exist in the netlist")]
    NullReference(String),

    /// A net has more than one driving endpoint
    #[error("net {net} is driven by {drivers} sources")]
    MultiDrivenNet {
        /// The offending net
        net: NetId,
        /// Number of sources found on it
        drivers: usize,
    },

    /// An input pin used by a gate function has no net connected
    #[error("pin '{pin}' of gate {gate} has no fan-in net")]
    UnconnectedPin {
        /// Gate owning the pin
        gate: GateId,
        /// Name of the unconnected pin
        pin: String,
    },

    /// A gate type declares a function that cannot be resolved against its own pins
    #[error("gate type '{gate_type}': {reason}")]
    MalformedGateType {
        /// Name of the gate type
        gate_type: String,
        /// What is wrong with it
        reason: String,
    },

    /// The subgraph contains a combinational loop through this net
    #[error("subgraph contains a combinational cycle through net {0}")]
    CombinationalCycle(NetId),

    /// The expression backend rejected an operation
    #[error("expression backend error: {0}")]
    Backend(String),

    /// A variable name does not follow the net variable naming scheme
    #[error("'{0}' is not a net variable name")]
    InvalidVariableName(String),

    /// A variable name refers to a net id that does not exist
    #[error("no net with id {0}")]
    UnknownNet(u32),

    /// An empty list of nets was given where at least one is needed
    #[error("no nets selected")]
    EmptySelection,

    /// A textual Boolean function could not be parsed
    #[error("cannot parse Boolean function '{input}': {reason}")]
    Parse {
        /// The text that failed to parse
        input: String,
        /// What went wrong
        reason: String,
    },

    /// A netlist connection refers to an invalid pin
    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// A worker thread could not be started
    #[error("failed to start worker thread")]
    WorkerSpawn(#[source] std::io::Error),

    /// Context attached once by the outermost compilation call
    #[error("could not compile the subgraph function of net {output}")]
    InOutput {
        /// The requested output net
        output: NetId,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the requested output to an error, once
    pub(crate) fn in_output(self, output: NetId) -> Error {
        match self {
            Error::InOutput { .. } => self,
            e => Error::InOutput {
                output,
                source: Box::new(e),
            },
        }
    }

    /// Return the error without its output context
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::InOutput { source, .. } => source.root_cause(),
            e => e,
        }
    }

    /// Return the output net named by the context, if any
    pub fn output(&self) -> Option<NetId> {
        match self {
            Error::InOutput { output, .. } => Some(*output),
            _ => None,
        }
    }

    pub(crate) fn backend(msg: impl Into<String>) -> Error {
        Error::Backend(msg.into())
    }
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_context() {
        let n = NetId::from_raw(7);
        let e = Error::CombinationalCycle(NetId::from_raw(3)).in_output(n);
        let e = e.in_output(NetId::from_raw(9));
        assert_eq!(e.output(), Some(n));
        assert!(matches!(e.root_cause(), Error::CombinationalCycle(c) if c.raw() == 3));
        assert_eq!(
            e.to_string(),
            "could not compile the subgraph function of net n7"
        );
    }

    #[test]
    fn test_root_without_context() {
        let e = Error::EmptySubgraph;
        assert!(matches!(e.root_cause(), Error::EmptySubgraph));
        assert_eq!(e.output(), None);
    }
}
