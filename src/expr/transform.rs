//! Simplification, substitution and evaluation of expressions
//!
//! All traversals are memoized on the shared nodes, so their cost is linear in the size of the DAG.

use fxhash::FxHashMap;

use crate::error::{Error, Result};
use crate::expr::{mask, Expr, Op};

impl Expr {
    /// Simplify the expression with local rewriting rules
    ///
    /// Constants are folded, and trivial identities such as `x & x`, `x & !x`, `x ^ x` or `!!x`
    /// are removed. The result is equivalent to the original expression.
    pub fn simplify(&self) -> Expr {
        let mut memo = FxHashMap::default();
        simplify_rec(self, &mut memo)
    }

    /// Simplify the expression, keeping the given subexpressions as they are
    ///
    /// The leaves must already be simplified. The traversal stops at them, so the cost is
    /// proportional to the part of the expression above the leaves.
    pub fn simplify_with_leaves<'e>(&self, leaves: impl IntoIterator<Item = &'e Expr>) -> Expr {
        let mut memo = leaf_memo(leaves);
        simplify_rec(self, &mut memo)
    }

    /// Replace the variables by the given expressions
    ///
    /// Variables without a binding are kept. A binding whose width differs from the
    /// variable's is an error.
    pub fn substitute(&self, bindings: &FxHashMap<String, Expr>) -> Result<Expr> {
        let mut memo = FxHashMap::default();
        substitute_rec(self, bindings, &mut memo)
    }

    /// Evaluate the expression for an assignment of all its variables
    pub fn evaluate(&self, assignment: &FxHashMap<String, u64>) -> Result<u64> {
        let mut memo = FxHashMap::default();
        evaluate_rec(self, assignment, &mut memo)
    }
}

/// Cheap syntactic identity, without a full structural comparison
fn same(a: &Expr, b: &Expr) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    if a.width() != b.width() {
        return false;
    }
    match (a.op(), b.op()) {
        (Op::Var(x), Op::Var(y)) => x == y,
        (Op::Const(x), Op::Const(y)) => x == y,
        _ => false,
    }
}

fn complementary(a: &Expr, b: &Expr) -> bool {
    match (a.op(), b.op()) {
        (Op::Not(x), _) if same(x, b) => true,
        (_, Op::Not(y)) if same(a, y) => true,
        _ => false,
    }
}

fn is_ones(e: &Expr) -> bool {
    e.constant_value() == Some(mask(e.width()))
}

fn is_zero(e: &Expr) -> bool {
    e.constant_value() == Some(0)
}

/// Rebuild a node with new operands, reusing the original when nothing changed
fn rebuild(orig: &Expr, operands: &[Expr]) -> Expr {
    let unchanged = orig
        .operands()
        .iter()
        .zip(operands)
        .all(|(a, b)| a.ptr_eq(b));
    if unchanged {
        return orig.clone();
    }
    let op = match (orig.op(), operands) {
        (Op::Not(_), [a]) => Op::Not(a.clone()),
        (Op::Zext(_), [a]) => Op::Zext(a.clone()),
        (Op::Sext(_), [a]) => Op::Sext(a.clone()),
        (Op::And(..), [a, b]) => Op::And(a.clone(), b.clone()),
        (Op::Or(..), [a, b]) => Op::Or(a.clone(), b.clone()),
        (Op::Xor(..), [a, b]) => Op::Xor(a.clone(), b.clone()),
        (Op::Concat(..), [a, b]) => Op::Concat(a.clone(), b.clone()),
        _ => return orig.clone(),
    };
    Expr::from_op(orig.width(), op)
}

fn simplify_not(orig: &Expr, a: &Expr) -> Expr {
    if let Some(v) = a.constant_value() {
        return Expr::masked_constant(a.width(), !v);
    }
    if let Op::Not(x) = a.op() {
        return x.clone();
    }
    rebuild(orig, &[a.clone()])
}

fn simplify_and(orig: &Expr, a: &Expr, b: &Expr) -> Expr {
    let w = orig.width();
    if let (Some(x), Some(y)) = (a.constant_value(), b.constant_value()) {
        return Expr::masked_constant(w, x & y);
    }
    if is_zero(a) || is_zero(b) || complementary(a, b) {
        return Expr::masked_constant(w, 0);
    }
    if is_ones(a) || same(a, b) {
        return b.clone();
    }
    if is_ones(b) {
        return a.clone();
    }
    rebuild(orig, &[a.clone(), b.clone()])
}

fn simplify_or(orig: &Expr, a: &Expr, b: &Expr) -> Expr {
    let w = orig.width();
    if let (Some(x), Some(y)) = (a.constant_value(), b.constant_value()) {
        return Expr::masked_constant(w, x | y);
    }
    if is_ones(a) || is_ones(b) || complementary(a, b) {
        return Expr::masked_constant(w, mask(w));
    }
    if is_zero(a) || same(a, b) {
        return b.clone();
    }
    if is_zero(b) {
        return a.clone();
    }
    rebuild(orig, &[a.clone(), b.clone()])
}

fn simplify_xor(orig: &Expr, a: &Expr, b: &Expr) -> Expr {
    let w = orig.width();
    if let (Some(x), Some(y)) = (a.constant_value(), b.constant_value()) {
        return Expr::masked_constant(w, x ^ y);
    }
    if same(a, b) {
        return Expr::masked_constant(w, 0);
    }
    if complementary(a, b) {
        return Expr::masked_constant(w, mask(w));
    }
    if is_zero(a) {
        return b.clone();
    }
    if is_zero(b) {
        return a.clone();
    }
    if is_ones(a) {
        return simplify_not(&!b, b);
    }
    if is_ones(b) {
        return simplify_not(&!a, a);
    }
    rebuild(orig, &[a.clone(), b.clone()])
}

fn simplify_rec(e: &Expr, memo: &mut FxHashMap<usize, Expr>) -> Expr {
    if let Some(s) = memo.get(&e.id()) {
        return s.clone();
    }
    let s = match e.op() {
        Op::Const(_) | Op::Var(_) => e.clone(),
        Op::Not(a) => {
            let a = simplify_rec(a, memo);
            simplify_not(e, &a)
        }
        Op::And(a, b) => {
            let (a, b) = (simplify_rec(a, memo), simplify_rec(b, memo));
            simplify_and(e, &a, &b)
        }
        Op::Or(a, b) => {
            let (a, b) = (simplify_rec(a, memo), simplify_rec(b, memo));
            simplify_or(e, &a, &b)
        }
        Op::Xor(a, b) => {
            let (a, b) = (simplify_rec(a, memo), simplify_rec(b, memo));
            simplify_xor(e, &a, &b)
        }
        Op::Concat(a, b) => {
            let (a, b) = (simplify_rec(a, memo), simplify_rec(b, memo));
            match (a.constant_value(), b.constant_value()) {
                (Some(x), Some(y)) => Expr::masked_constant(e.width(), (x << b.width()) | y),
                _ => rebuild(e, &[a, b]),
            }
        }
        Op::Zext(a) => {
            let a = simplify_rec(a, memo);
            if a.width() == e.width() {
                a
            } else if let Some(v) = a.constant_value() {
                Expr::masked_constant(e.width(), v)
            } else {
                rebuild(e, &[a])
            }
        }
        Op::Sext(a) => {
            let a = simplify_rec(a, memo);
            if a.width() == e.width() {
                a
            } else if let Some(v) = a.constant_value() {
                Expr::masked_constant(e.width(), sign_extend_value(v, a.width()))
            } else {
                rebuild(e, &[a])
            }
        }
    };
    memo.insert(e.id(), s.clone());
    s
}

fn leaf_memo<'e>(leaves: impl IntoIterator<Item = &'e Expr>) -> FxHashMap<usize, Expr> {
    leaves.into_iter().map(|l| (l.id(), l.clone())).collect()
}

fn sign_extend_value(v: u64, width: u32) -> u64 {
    if width < 64 && (v >> (width - 1)) & 1 != 0 {
        v | !mask(width)
    } else {
        v
    }
}

fn substitute_rec(
    e: &Expr,
    bindings: &FxHashMap<String, Expr>,
    memo: &mut FxHashMap<usize, Expr>,
) -> Result<Expr> {
    if let Some(s) = memo.get(&e.id()) {
        return Ok(s.clone());
    }
    let s = match e.op() {
        Op::Const(_) => e.clone(),
        Op::Var(name) => match bindings.get(&**name) {
            Some(b) => {
                if b.width() != e.width() {
                    return Err(Error::backend(format!(
                        "cannot substitute {} bits for variable '{name}' of {} bits",
                        b.width(),
                        e.width()
                    )));
                }
                b.clone()
            }
            None => e.clone(),
        },
        _ => {
            let mut operands = Vec::new();
            for o in e.operands() {
                operands.push(substitute_rec(o, bindings, memo)?);
            }
            rebuild(e, &operands)
        }
    };
    memo.insert(e.id(), s.clone());
    Ok(s)
}

fn evaluate_rec(
    e: &Expr,
    assignment: &FxHashMap<String, u64>,
    memo: &mut FxHashMap<usize, u64>,
) -> Result<u64> {
    if let Some(v) = memo.get(&e.id()) {
        return Ok(*v);
    }
    let m = mask(e.width());
    let v = match e.op() {
        Op::Const(v) => *v,
        Op::Var(name) => match assignment.get(&**name) {
            Some(v) => v & m,
            None => {
                return Err(Error::backend(format!("no value for variable '{name}'")));
            }
        },
        Op::Not(a) => !evaluate_rec(a, assignment, memo)? & m,
        Op::And(a, b) => evaluate_rec(a, assignment, memo)? & evaluate_rec(b, assignment, memo)?,
        Op::Or(a, b) => evaluate_rec(a, assignment, memo)? | evaluate_rec(b, assignment, memo)?,
        Op::Xor(a, b) => evaluate_rec(a, assignment, memo)? ^ evaluate_rec(b, assignment, memo)?,
        Op::Concat(a, b) => {
            let hi = evaluate_rec(a, assignment, memo)?;
            let lo = evaluate_rec(b, assignment, memo)?;
            ((hi << b.width()) | lo) & m
        }
        Op::Zext(a) => evaluate_rec(a, assignment, memo)?,
        Op::Sext(a) => sign_extend_value(evaluate_rec(a, assignment, memo)?, a.width()) & m,
    };
    memo.insert(e.id(), v);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, Expr)]) -> FxHashMap<String, Expr> {
        pairs
            .iter()
            .map(|(n, e)| (n.to_string(), e.clone()))
            .collect()
    }

    fn values(pairs: &[(&str, u64)]) -> FxHashMap<String, u64> {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn test_simplify_identities() {
        let a = Expr::bit("a");
        let b = Expr::bit("b");
        let c0 = Expr::zero();
        let c1 = Expr::one();
        assert_eq!((&a & &a).simplify(), a);
        assert_eq!((&a & &!&a).simplify(), c0);
        assert_eq!((&a | &!&a).simplify(), c1);
        assert_eq!((&a ^ &a).simplify(), c0);
        assert_eq!((&a ^ &!&a).simplify(), c1);
        assert_eq!((!!&a).simplify(), a);
        assert_eq!((&a & &c1).simplify(), a);
        assert_eq!((&a & &c0).simplify(), c0);
        assert_eq!((&a | &c0).simplify(), a);
        assert_eq!((&a | &c1).simplify(), c1);
        assert_eq!((&a ^ &c1).simplify(), !&a);
        assert_eq!((&a ^ &c0).simplify(), a);
        let ab = &a & &b;
        assert_eq!(ab.simplify(), ab);
    }

    #[test]
    fn test_simplify_nested() {
        let a = Expr::bit("a");
        let b = Expr::bit("b");
        // (a & 1) ^ (b | 0) ^ a -> b after folding
        let e = &(&(&a & &Expr::one()) ^ &(&b | &Expr::zero())) ^ &a;
        let s = e.simplify();
        let mut vars = s.free_variables().into_iter();
        assert!(vars.next().is_some());
        for av in 0..2 {
            for bv in 0..2 {
                let asg = values(&[("a", av), ("b", bv)]);
                assert_eq!(s.evaluate(&asg).unwrap(), e.evaluate(&asg).unwrap());
            }
        }
    }

    #[test]
    fn test_simplify_wide() {
        let c = Expr::constant(4, 0b1010).unwrap();
        let d = Expr::constant(4, 0b0110).unwrap();
        assert_eq!((&c ^ &d).simplify().constant_value(), Some(0b1100));
        assert_eq!(c.concat(&d).unwrap().simplify().constant_value(), Some(0xa6));
        assert_eq!(c.zero_extend(8).unwrap().simplify().constant_value(), Some(0x0a));
        assert_eq!(c.sign_extend(8).unwrap().simplify().constant_value(), Some(0xfa));
        assert_eq!(d.sign_extend(8).unwrap().simplify().constant_value(), Some(0x06));
        assert_eq!((!&c).simplify().constant_value(), Some(0b0101));
        let x = Expr::var("x", 4).unwrap();
        assert_eq!(x.zero_extend(4).unwrap().simplify(), x);
    }

    #[test]
    fn test_simplify_with_leaves() {
        let a = Expr::bit("a");
        let b = Expr::bit("b");
        // The leaf is left untouched even if it could be simplified
        let leaf = &a & &a;
        let e = &(&leaf & &Expr::one()) ^ &b;
        assert_eq!(e.simplify_with_leaves([&leaf]), &leaf ^ &b);
        assert_eq!(e.simplify(), &a ^ &b);
        // Simplified leaves give the same result as a full simplification
        let leaf = leaf.simplify();
        let e = &(&leaf & &Expr::one()) ^ &(&b & &b);
        assert_eq!(e.simplify_with_leaves([&leaf]), e.simplify());
    }

    #[test]
    fn test_simplify_chain_stops_at_leaves() {
        // Each step adds one gate on top of the previous, already simplified, result
        let mut acc = Expr::bit("x0");
        for i in 1..2000 {
            let step = &acc & &Expr::bit(&format!("x{i}"));
            let mut memo = leaf_memo([&acc]);
            let next = simplify_rec(&step, &mut memo);
            // The leaf, the new variable and the new gate
            assert_eq!(memo.len(), 3);
            acc = next;
        }
        assert_eq!(acc.simplify(), acc);
    }

    #[test]
    fn test_substitute() {
        let a = Expr::bit("a");
        let b = Expr::bit("b");
        let f = Expr::parse("a & !b").unwrap();
        let g = f.substitute(&bindings(&[("a", &a ^ &b)])).unwrap();
        assert_eq!(g, &(&a ^ &b) & &!&b);
        // Unbound variables are kept
        assert_eq!(f.substitute(&bindings(&[])).unwrap(), f);
        assert!(f.substitute(&bindings(&[])).unwrap().ptr_eq(&f));
        // Width mismatch
        let w = Expr::var("w", 2).unwrap();
        assert!(f.substitute(&bindings(&[("a", w)])).is_err());
    }

    #[test]
    fn test_substitute_keeps_sharing() {
        let mut e = Expr::bit("x");
        for _ in 0..100 {
            e = &e ^ &e;
        }
        let s = e.substitute(&bindings(&[("x", Expr::bit("y"))])).unwrap();
        assert_eq!(s.size(), e.size());
        assert_eq!(s.simplify(), Expr::zero());
    }

    #[test]
    fn test_evaluate() {
        let f = Expr::parse("(a & b) | (!a & c)").unwrap();
        for i in 0..8u64 {
            let (a, b, c) = (i & 1, (i >> 1) & 1, (i >> 2) & 1);
            let expected = if a == 1 { b } else { c };
            let asg = values(&[("a", a), ("b", b), ("c", c)]);
            assert_eq!(f.evaluate(&asg).unwrap(), expected);
        }
        assert!(f.evaluate(&values(&[("a", 1)])).is_err());
    }

    #[test]
    fn test_evaluate_bus() {
        let hi = Expr::bit("hi");
        let lo = Expr::bit("lo");
        let bus = hi.concat(&lo).unwrap();
        let s = bus.sign_extend(8).unwrap();
        let z = bus.zero_extend(8).unwrap();
        assert_eq!(s.evaluate(&values(&[("hi", 1), ("lo", 0)])).unwrap(), 0xfe);
        assert_eq!(z.evaluate(&values(&[("hi", 1), ("lo", 0)])).unwrap(), 0x02);
        assert_eq!(s.evaluate(&values(&[("hi", 0), ("lo", 1)])).unwrap(), 0x01);
        let full = Expr::var("v", 64).unwrap();
        assert_eq!((!&full).evaluate(&values(&[("v", 0)])).unwrap(), u64::MAX);
    }
}
