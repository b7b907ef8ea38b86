//! Expression backends used by the subgraph compilers
//!
//! A backend owns the construction of expressions. The compilers are generic over
//! [`ExpressionBackend`], so that the traversal, caching and error handling are written once.
//! Two backends are provided:
//! * [`ExprBackend`], stateless, producing native [`Expr`] trees;
//! * [`AigContext`], producing [`Word`]s in a structurally hashed graph.

use std::collections::BTreeSet;
use std::fmt::Debug;

use fxhash::FxHashMap;

use crate::aig::{AigContext, Word};
use crate::error::Result;
use crate::expr::Expr;

/// The algebra needed to build subgraph functions
///
/// All construction takes `&mut self`: a backend may hold a shared context that is
/// mutated by every operation.
pub trait ExpressionBackend {
    /// Type of the expressions built by the backend
    type Expr: Clone + Debug + Send + Sync;

    /// Create a free variable
    fn make_variable(&mut self, name: &str, width: u32) -> Result<Self::Expr>;

    /// Create a constant
    fn make_constant(&mut self, width: u32, value: u64) -> Result<Self::Expr>;

    /// Translate a gate function into the backend, replacing its variables by the bindings
    ///
    /// Unbound variables become free variables of the same name.
    fn lower(
        &mut self,
        function: &Expr,
        bindings: &FxHashMap<String, Self::Expr>,
    ) -> Result<Self::Expr>;

    /// Replace free variables by expressions
    fn substitute(
        &mut self,
        expr: &Self::Expr,
        bindings: &FxHashMap<String, Self::Expr>,
    ) -> Result<Self::Expr>;

    /// Simplify an expression
    fn simplify(&mut self, expr: &Self::Expr) -> Result<Self::Expr>;

    /// Lower a gate function over simplified bindings, then simplify the result
    ///
    /// Backends may skip the bindings while simplifying, so that building a function on top of
    /// already compiled logic does not walk that logic again.
    fn lower_simplified(
        &mut self,
        function: &Expr,
        bindings: &FxHashMap<String, Self::Expr>,
    ) -> Result<Self::Expr> {
        let lowered = self.lower(function, bindings)?;
        self.simplify(&lowered)
    }

    /// Concatenation, with `hi` as the most significant part
    fn concat(&mut self, hi: &Self::Expr, lo: &Self::Expr) -> Result<Self::Expr>;

    /// Zero extension
    fn zero_extend(&mut self, expr: &Self::Expr, width: u32) -> Result<Self::Expr>;

    /// Sign extension
    fn sign_extend(&mut self, expr: &Self::Expr, width: u32) -> Result<Self::Expr>;

    /// Names of the free variables
    fn free_variable_names(&self, expr: &Self::Expr) -> BTreeSet<String>;

    /// Width in bits
    fn width(&self, expr: &Self::Expr) -> u32;

    /// Value of the expression if it is a constant
    fn constant_value(&self, expr: &Self::Expr) -> Option<u64>;

    /// Returns true if the expression is a constant
    fn is_constant(&self, expr: &Self::Expr) -> bool {
        self.constant_value(expr).is_some()
    }

    /// Evaluate an expression for an assignment of all its variables
    fn evaluate(&self, expr: &Self::Expr, assignment: &FxHashMap<String, u64>) -> Result<u64>;
}

/// Backend building native expression trees
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprBackend;

impl ExpressionBackend for ExprBackend {
    type Expr = Expr;

    fn make_variable(&mut self, name: &str, width: u32) -> Result<Expr> {
        Expr::var(name, width)
    }

    fn make_constant(&mut self, width: u32, value: u64) -> Result<Expr> {
        Expr::constant(width, value)
    }

    fn lower(&mut self, function: &Expr, bindings: &FxHashMap<String, Expr>) -> Result<Expr> {
        function.substitute(bindings)
    }

    fn substitute(&mut self, expr: &Expr, bindings: &FxHashMap<String, Expr>) -> Result<Expr> {
        expr.substitute(bindings)
    }

    fn simplify(&mut self, expr: &Expr) -> Result<Expr> {
        Ok(expr.simplify())
    }

    fn lower_simplified(
        &mut self,
        function: &Expr,
        bindings: &FxHashMap<String, Expr>,
    ) -> Result<Expr> {
        Ok(function
            .substitute(bindings)?
            .simplify_with_leaves(bindings.values()))
    }

    fn concat(&mut self, hi: &Expr, lo: &Expr) -> Result<Expr> {
        hi.concat(lo)
    }

    fn zero_extend(&mut self, expr: &Expr, width: u32) -> Result<Expr> {
        expr.zero_extend(width)
    }

    fn sign_extend(&mut self, expr: &Expr, width: u32) -> Result<Expr> {
        expr.sign_extend(width)
    }

    fn free_variable_names(&self, expr: &Expr) -> BTreeSet<String> {
        expr.free_variables()
    }

    fn width(&self, expr: &Expr) -> u32 {
        expr.width()
    }

    fn constant_value(&self, expr: &Expr) -> Option<u64> {
        expr.constant_value()
    }

    fn evaluate(&self, expr: &Expr, assignment: &FxHashMap<String, u64>) -> Result<u64> {
        expr.evaluate(assignment)
    }
}

impl ExpressionBackend for AigContext {
    type Expr = Word;

    fn make_variable(&mut self, name: &str, width: u32) -> Result<Word> {
        self.variable(name, width)
    }

    fn make_constant(&mut self, width: u32, value: u64) -> Result<Word> {
        self.constant(width, value)
    }

    fn lower(&mut self, function: &Expr, bindings: &FxHashMap<String, Word>) -> Result<Word> {
        AigContext::lower(self, function, bindings)
    }

    fn substitute(&mut self, expr: &Word, bindings: &FxHashMap<String, Word>) -> Result<Word> {
        AigContext::substitute(self, expr, bindings)
    }

    /// Construction already normalizes and hashes every node
    fn simplify(&mut self, expr: &Word) -> Result<Word> {
        Ok(expr.clone())
    }

    fn concat(&mut self, hi: &Word, lo: &Word) -> Result<Word> {
        AigContext::concat(self, hi, lo)
    }

    fn zero_extend(&mut self, expr: &Word, width: u32) -> Result<Word> {
        AigContext::zero_extend(self, expr, width)
    }

    fn sign_extend(&mut self, expr: &Word, width: u32) -> Result<Word> {
        AigContext::sign_extend(self, expr, width)
    }

    fn free_variable_names(&self, expr: &Word) -> BTreeSet<String> {
        AigContext::free_variable_names(self, expr)
    }

    fn width(&self, expr: &Word) -> u32 {
        expr.width()
    }

    fn constant_value(&self, expr: &Word) -> Option<u64> {
        expr.constant_value()
    }

    fn evaluate(&self, expr: &Word, assignment: &FxHashMap<String, u64>) -> Result<u64> {
        AigContext::evaluate(self, expr, assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The same construction in any backend, returned with the majority function it should equal
    fn build<B: ExpressionBackend>(b: &mut B) -> B::Expr {
        let maj = Expr::parse("(A & B) | (A & C) | (B & C)").unwrap();
        let x = b.make_variable("x", 1).unwrap();
        let one = b.make_constant(1, 1).unwrap();
        let bindings = [("A".to_string(), x.clone()), ("B".to_string(), one)]
            .into_iter()
            .collect();
        // maj(x, 1, C) = x | C
        let f = b.lower(&maj, &bindings).unwrap();
        b.simplify(&f).unwrap()
    }

    fn check<B: ExpressionBackend>(mut b: B) {
        let f = build(&mut b);
        assert_eq!(b.width(&f), 1);
        let names: Vec<_> = b.free_variable_names(&f).into_iter().collect();
        assert_eq!(names, vec!["C".to_string(), "x".to_string()]);
        for i in 0..4u64 {
            let asg = [("x".to_string(), i & 1), ("C".to_string(), i >> 1)]
                .into_iter()
                .collect();
            assert_eq!(b.evaluate(&f, &asg).unwrap(), (i != 0) as u64);
        }
        let zero = b.make_constant(1, 0).unwrap();
        let bindings = [("x".to_string(), zero.clone()), ("C".to_string(), zero)]
            .into_iter()
            .collect();
        let g = b.substitute(&f, &bindings).unwrap();
        let g = b.simplify(&g).unwrap();
        assert!(b.is_constant(&g));
        assert_eq!(b.constant_value(&g), Some(0));

        let hi = b.make_variable("hi", 1).unwrap();
        let lo = b.make_constant(2, 0b01).unwrap();
        let cat = b.concat(&hi, &lo).unwrap();
        let s = b.sign_extend(&cat, 6).unwrap();
        let z = b.zero_extend(&cat, 6).unwrap();
        let asg = [("hi".to_string(), 1)].into_iter().collect();
        assert_eq!(b.evaluate(&s, &asg).unwrap(), 0b111101);
        assert_eq!(b.evaluate(&z, &asg).unwrap(), 0b000101);
        assert!(b.zero_extend(&cat, 2).is_err());
        assert!(b.make_constant(2, 4).is_err());
        assert!(b.make_variable("w", 0).is_err());
    }

    fn check_lower_simplified<B: ExpressionBackend>(mut b: B) {
        let f = build(&mut b);
        let xor = Expr::parse("A ^ B ^ A").unwrap();
        let bindings = [("A".to_string(), f.clone()), ("B".to_string(), f.clone())]
            .into_iter()
            .collect();
        let g = b.lower_simplified(&xor, &bindings).unwrap();
        let lowered = b.lower(&xor, &bindings).unwrap();
        let expected = b.simplify(&lowered).unwrap();
        assert_eq!(format!("{g:?}"), format!("{expected:?}"));
        for i in 0..4u64 {
            let asg = [("x".to_string(), i & 1), ("C".to_string(), i >> 1)]
                .into_iter()
                .collect();
            assert_eq!(b.evaluate(&g, &asg).unwrap(), b.evaluate(&f, &asg).unwrap());
        }
    }

    #[test]
    fn test_lower_simplified() {
        check_lower_simplified(ExprBackend);
        check_lower_simplified(AigContext::new());
    }

    #[test]
    fn test_expr_backend() {
        check(ExprBackend);
    }

    #[test]
    fn test_aig_backend() {
        check(AigContext::new());
    }
}
