//! Naming of net variables, and helpers building expressions over nets
//!
//! The variable of a net is its id with a fixed prefix, such as `net_12`. This name is the only
//! link between the free variables of an expression and the nets of the netlist.

use std::collections::BTreeSet;

use fxhash::FxHashMap;

use crate::backend::ExpressionBackend;
use crate::error::{Error, Result};
use crate::netlist::{GateProperty, NetId, Netlist};

/// Prefix of all net variable names
pub const NET_PREFIX: &str = "net_";

/// Variable name of a net
pub fn encode(net: NetId) -> String {
    format!("{NET_PREFIX}{}", net.raw())
}

/// Net of a variable name
///
/// The name must be exactly the prefix followed by a decimal id without leading zeros, and the
/// net must exist in the netlist.
pub fn decode(name: &str, netlist: &Netlist) -> Result<NetId> {
    let invalid = || Error::InvalidVariableName(name.to_string());
    let digits = name.strip_prefix(NET_PREFIX).ok_or_else(invalid)?;
    if digits.is_empty()
        || !digits.bytes().all(|c| c.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
    {
        return Err(invalid());
    }
    let id: u32 = digits.parse().map_err(|_| invalid())?;
    let net = NetId::from_raw(id);
    if netlist.net(net).is_err() {
        return Err(Error::UnknownNet(id));
    }
    Ok(net)
}

/// Nets of all free variables of an expression
pub fn free_variables<B: ExpressionBackend>(
    backend: &B,
    expr: &B::Expr,
    netlist: &Netlist,
) -> Result<BTreeSet<NetId>> {
    backend
        .free_variable_names(expr)
        .iter()
        .map(|name| decode(name, netlist))
        .collect()
}

/// Concatenation of the variables of several nets; the first net is the most significant bit
///
/// If `extend_to_width` is larger than the number of nets, the result is zero-extended, or
/// sign-extended if `sign_extend` is set.
pub fn bus_concat<B: ExpressionBackend>(
    backend: &mut B,
    netlist: &Netlist,
    nets: &[NetId],
    extend_to_width: u32,
    sign_extend: bool,
) -> Result<B::Expr> {
    let (first, rest) = nets.split_first().ok_or(Error::EmptySelection)?;
    netlist.net(*first)?;
    let mut ret = backend.make_variable(&encode(*first), 1)?;
    for n in rest {
        netlist.net(*n)?;
        let v = backend.make_variable(&encode(*n), 1)?;
        ret = backend.concat(&ret, &v)?;
    }
    if extend_to_width > backend.width(&ret) {
        ret = if sign_extend {
            backend.sign_extend(&ret, extend_to_width)?
        } else {
            backend.zero_extend(&ret, extend_to_width)?
        };
    }
    Ok(ret)
}

/// Replace the variables of nets driven by a constant cell by their value
///
/// A net whose only driver is a power cell becomes 1, a net whose only driver is a ground cell
/// becomes 0. Variables that do not name a net are left untouched.
pub fn substitute_constant_sources<B: ExpressionBackend>(
    backend: &mut B,
    netlist: &Netlist,
    expr: &B::Expr,
) -> Result<B::Expr> {
    let mut bindings = FxHashMap::default();
    for name in backend.free_variable_names(expr) {
        let Ok(net) = decode(&name, netlist) else {
            continue;
        };
        let [source] = netlist.net(net)?.sources() else {
            continue;
        };
        let gate = netlist.gate(source.gate)?;
        if gate.has_property(GateProperty::Power) {
            let one = backend.make_constant(1, 1)?;
            bindings.insert(name, one);
        } else if gate.has_property(GateProperty::Ground) {
            let zero = backend.make_constant(1, 0)?;
            bindings.insert(name, zero);
        }
    }
    if bindings.is_empty() {
        return Ok(expr.clone());
    }
    let ret = backend.substitute(expr, &bindings)?;
    backend.simplify(&ret)
}
