//! Equivalence checking by simulation
//!
//! Two expressions, possibly built by different backends, are evaluated on the same input
//! patterns. This is complete for small functions of single-bit variables, and a
//! random-pattern test otherwise.

use std::collections::BTreeSet;

use fxhash::FxHashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::backend::ExpressionBackend;
use crate::error::Result;

/// Maximum number of variables to enumerate exhaustively
pub const MAX_EXHAUSTIVE_VARS: usize = 12;

/// Look for an assignment on which two expressions differ
///
/// With at most [`MAX_EXHAUSTIVE_VARS`] variables, all 0/1 assignments are tried. Then
/// `nb_patterns` random assignments, generated from `seed`, are tried; they also exercise the
/// upper bits of wide variables. Returns the first distinguishing assignment, or `None` if
/// none was found. Expressions of different widths are never equivalent.
pub fn check_equivalence<A: ExpressionBackend, B: ExpressionBackend>(
    a_backend: &A,
    a: &A::Expr,
    b_backend: &B,
    b: &B::Expr,
    nb_patterns: usize,
    seed: u64,
) -> Result<Option<FxHashMap<String, u64>>> {
    let mut names: BTreeSet<String> = a_backend.free_variable_names(a);
    names.extend(b_backend.free_variable_names(b));

    if a_backend.width(a) != b_backend.width(b) {
        return Ok(Some(names.into_iter().map(|n| (n, 0)).collect()));
    }
    let differs = |assignment: &FxHashMap<String, u64>| -> Result<bool> {
        Ok(a_backend.evaluate(a, assignment)? != b_backend.evaluate(b, assignment)?)
    };

    if names.len() <= MAX_EXHAUSTIVE_VARS {
        for pattern in 0..1u64 << names.len() {
            let assignment = names
                .iter()
                .enumerate()
                .map(|(i, n)| (n.clone(), (pattern >> i) & 1))
                .collect();
            if differs(&assignment)? {
                return Ok(Some(assignment));
            }
        }
    }

    let mut rng = SmallRng::seed_from_u64(seed);
    for _ in 0..nb_patterns {
        let assignment = names.iter().map(|n| (n.clone(), rng.gen())).collect();
        if differs(&assignment)? {
            return Ok(Some(assignment));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::AigContext;
    use crate::backend::ExprBackend;
    use crate::expr::Expr;

    #[test]
    fn test_same_backend() {
        let a = Expr::parse("!(x & y)").unwrap();
        let b = Expr::parse("!x | !y").unwrap();
        let c = Expr::parse("!x & !y").unwrap();
        assert!(check_equivalence(&ExprBackend, &a, &ExprBackend, &b, 16, 0)
            .unwrap()
            .is_none());
        let cex = check_equivalence(&ExprBackend, &a, &ExprBackend, &c, 16, 0)
            .unwrap()
            .unwrap();
        assert_ne!(a.evaluate(&cex).unwrap(), c.evaluate(&cex).unwrap());
    }

    #[test]
    fn test_cross_backend() {
        let f = Expr::parse("(a & b) | (a & c) | (b & c)").unwrap();
        let mut ctx = AigContext::new();
        let w = ctx.lower(&f, &FxHashMap::default()).unwrap();
        assert!(check_equivalence(&ExprBackend, &f, &ctx, &w, 16, 1)
            .unwrap()
            .is_none());
        let g = Expr::parse("a ^ b ^ c").unwrap();
        assert!(check_equivalence(&ExprBackend, &g, &ctx, &w, 16, 1)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_different_support() {
        // A variable missing on one side is still assigned
        let a = Expr::parse("x | (y & !y)").unwrap();
        let b = Expr::bit("x");
        assert!(check_equivalence(&ExprBackend, &a, &ExprBackend, &b, 16, 2)
            .unwrap()
            .is_none());
        let c = Expr::parse("x | z").unwrap();
        let cex = check_equivalence(&ExprBackend, &b, &ExprBackend, &c, 16, 2)
            .unwrap()
            .unwrap();
        assert_eq!(cex.get("x"), Some(&0));
        assert_eq!(cex.get("z"), Some(&1));
    }

    #[test]
    fn test_wide() {
        let x = Expr::var("x", 16).unwrap();
        let y = Expr::var("y", 16).unwrap();
        let a = &x ^ &y;
        let b = (&x | &y) & !(&x & &y);
        assert!(check_equivalence(&ExprBackend, &a, &ExprBackend, &b, 64, 3)
            .unwrap()
            .is_none());
        // Only differs on the upper bits
        let low = Expr::constant(16, 0xff).unwrap();
        let c = &a & &low;
        assert!(check_equivalence(&ExprBackend, &a, &ExprBackend, &c, 64, 3)
            .unwrap()
            .is_some());
        let narrow = Expr::bit("x");
        assert!(check_equivalence(&ExprBackend, &a, &ExprBackend, &narrow, 64, 3)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_many_variables() {
        let names: Vec<String> = (0..20).map(|i| format!("v{i}")).collect();
        let a = names
            .iter()
            .map(|n| Expr::bit(n))
            .reduce(|x, y| x ^ y)
            .unwrap();
        let b = names
            .iter()
            .rev()
            .map(|n| Expr::bit(n))
            .reduce(|x, y| x ^ y)
            .unwrap();
        assert!(check_equivalence(&ExprBackend, &a, &ExprBackend, &b, 256, 4)
            .unwrap()
            .is_none());
        let c = &b ^ &Expr::bit("v0");
        assert!(check_equivalence(&ExprBackend, &a, &ExprBackend, &c, 256, 4)
            .unwrap()
            .is_some());
    }
}
