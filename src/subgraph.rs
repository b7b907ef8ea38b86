//! Selection of the gates a compilation may expand

use fxhash::FxHashSet;

use crate::error::{Error, Result};
use crate::netlist::{Endpoint, Gate, GateId, GateProperty, NetId, Netlist};

/// A set of gates, given explicitly or as a predicate
///
/// Nets driven by a gate outside the subgraph are free variables of the compiled functions.
#[derive(Clone, Copy)]
pub enum Subgraph<'a> {
    /// An explicit list of gates; it must not be empty
    Gates(&'a [GateId]),
    /// All gates accepted by a predicate
    Filter(&'a (dyn Fn(&Gate) -> bool + Sync)),
    /// All gates whose type has a property, typically [`GateProperty::Combinational`]
    Property(GateProperty),
}

impl<'a> Subgraph<'a> {
    /// All combinational gates
    pub fn combinational() -> Subgraph<'static> {
        Subgraph::Property(GateProperty::Combinational)
    }

    /// Check the subgraph against the netlist
    pub(crate) fn membership(&self, netlist: &Netlist) -> Result<Membership<'a>> {
        match self {
            Subgraph::Gates(gates) => {
                if gates.is_empty() {
                    return Err(Error::EmptySubgraph);
                }
                for g in gates.iter() {
                    netlist.gate(*g)?;
                }
                Ok(Membership::Set(gates.iter().copied().collect()))
            }
            Subgraph::Filter(f) => Ok(Membership::Filter(*f)),
            Subgraph::Property(p) => Ok(Membership::Property(*p)),
        }
    }
}

impl std::fmt::Debug for Subgraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subgraph::Gates(g) => write!(f, "Gates({} gates)", g.len()),
            Subgraph::Filter(_) => write!(f, "Filter"),
            Subgraph::Property(p) => write!(f, "Property({p:?})"),
        }
    }
}

/// A validated subgraph
pub(crate) enum Membership<'a> {
    Set(FxHashSet<GateId>),
    Filter(&'a (dyn Fn(&Gate) -> bool + Sync)),
    Property(GateProperty),
}

impl Membership<'_> {
    pub(crate) fn contains(&self, gate: &Gate) -> bool {
        match self {
            Membership::Set(s) => s.contains(&gate.id()),
            Membership::Filter(f) => f(gate),
            Membership::Property(p) => gate.has_property(*p),
        }
    }

    /// The driver to expand for a net, or `None` if the net is a free variable
    pub(crate) fn driver<'n>(
        &self,
        netlist: &'n Netlist,
        net: NetId,
    ) -> Result<Option<&'n Endpoint>> {
        let sources = netlist.net(net)?.sources();
        match sources {
            [] => Ok(None),
            [driver] => {
                let gate = netlist.gate(driver.gate)?;
                if self.contains(gate) {
                    Ok(Some(driver))
                } else {
                    Ok(None)
                }
            }
            _ => Err(Error::MultiDrivenNet {
                net,
                drivers: sources.len(),
            }),
        }
    }
}
