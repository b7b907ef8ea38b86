//! Native symbolic Boolean functions
//!
//! [`Expr`] is the representation used by gate types to declare their pin functions, and the
//! expression type of the [`ExprBackend`](crate::backend::ExprBackend).
//! It is an immutable DAG: subexpressions are reference-counted and shared, and substitution
//! keeps this sharing, so that a ripple-carry chain stays linear in size.
//!
//! ```
//! # use netfunc::Expr;
//! let f = Expr::parse("(A & B) | !C").unwrap();
//! assert_eq!(f.width(), 1);
//! assert_eq!(f.free_variables().len(), 3);
//! assert_eq!(f.to_string(), "((A & B) | !C)");
//! ```

mod parse;
mod transform;

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::sync::Arc;

use fxhash::FxHashSet;

use crate::error::{Error, Result};

/// Largest width supported for an expression
pub const MAX_WIDTH: u32 = 64;

/// An immutable, shared Boolean (bit-vector) expression
#[derive(Clone)]
pub struct Expr {
    inner: Arc<Inner>,
}

struct Inner {
    width: u32,
    op: Op,
}

/// Operation at the root of an expression
#[derive(Clone, Debug)]
pub enum Op {
    /// Constant value, masked to the width
    Const(u64),
    /// Free variable
    Var(Arc<str>),
    /// Bitwise complement
    Not(Expr),
    /// Bitwise And
    And(Expr, Expr),
    /// Bitwise Or
    Or(Expr, Expr),
    /// Bitwise Xor
    Xor(Expr, Expr),
    /// Concatenation; the first operand holds the most significant bits
    Concat(Expr, Expr),
    /// Zero extension to the width of the expression
    Zext(Expr),
    /// Sign extension to the width of the expression
    Sext(Expr),
}

/// Mask of the valid bits for a width
pub(crate) fn mask(width: u32) -> u64 {
    if width >= 64 {
        !0
    } else {
        (1u64 << width) - 1
    }
}

pub(crate) fn check_width(width: u32) -> Result<()> {
    if width == 0 || width > MAX_WIDTH {
        Err(Error::backend(format!(
            "unsupported width {width}, expected 1 to {MAX_WIDTH}"
        )))
    } else {
        Ok(())
    }
}

impl Expr {
    fn from_op(width: u32, op: Op) -> Expr {
        Expr {
            inner: Arc::new(Inner { width, op }),
        }
    }

    /// Create a variable of the given width
    pub fn var(name: &str, width: u32) -> Result<Expr> {
        check_width(width)?;
        if name.is_empty() {
            return Err(Error::backend("empty variable name"));
        }
        Ok(Expr::from_op(width, Op::Var(name.into())))
    }

    /// Create a single-bit variable
    pub fn bit(name: &str) -> Expr {
        assert!(!name.is_empty(), "Empty variable name");
        Expr::from_op(1, Op::Var(name.into()))
    }

    /// Create a constant; the value must fit in the width
    pub fn constant(width: u32, value: u64) -> Result<Expr> {
        check_width(width)?;
        if value & !mask(width) != 0 {
            return Err(Error::backend(format!(
                "constant {value:#x} does not fit in {width} bits"
            )));
        }
        Ok(Expr::from_op(width, Op::Const(value)))
    }

    /// Single-bit zero
    pub fn zero() -> Expr {
        Expr::from_op(1, Op::Const(0))
    }

    /// Single-bit one
    pub fn one() -> Expr {
        Expr::from_op(1, Op::Const(1))
    }

    pub(crate) fn masked_constant(width: u32, value: u64) -> Expr {
        Expr::from_op(width, Op::Const(value & mask(width)))
    }

    /// Width in bits
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Operation at the root
    pub fn op(&self) -> &Op {
        &self.inner.op
    }

    /// Returns true if the expression is a constant
    pub fn is_constant(&self) -> bool {
        matches!(self.op(), Op::Const(_))
    }

    /// Value of the expression if it is a constant
    pub fn constant_value(&self) -> Option<u64> {
        match self.op() {
            Op::Const(v) => Some(*v),
            _ => None,
        }
    }

    /// Name of the variable if the expression is a variable
    pub fn var_name(&self) -> Option<&str> {
        match self.op() {
            Op::Var(n) => Some(&**n),
            _ => None,
        }
    }

    /// Bitwise And of two expressions of the same width
    pub fn and(&self, other: &Expr) -> Result<Expr> {
        self.check_same_width(other, "and")?;
        Ok(Expr::from_op(
            self.width(),
            Op::And(self.clone(), other.clone()),
        ))
    }

    /// Bitwise Or of two expressions of the same width
    pub fn or(&self, other: &Expr) -> Result<Expr> {
        self.check_same_width(other, "or")?;
        Ok(Expr::from_op(self.width(), Op::Or(self.clone(), other.clone())))
    }

    /// Bitwise Xor of two expressions of the same width
    pub fn xor(&self, other: &Expr) -> Result<Expr> {
        self.check_same_width(other, "xor")?;
        Ok(Expr::from_op(
            self.width(),
            Op::Xor(self.clone(), other.clone()),
        ))
    }

    /// Concatenation, with `self` as the most significant part
    pub fn concat(&self, lo: &Expr) -> Result<Expr> {
        let width = self.width() + lo.width();
        check_width(width)?;
        Ok(Expr::from_op(width, Op::Concat(self.clone(), lo.clone())))
    }

    /// Zero extension to a larger or equal width
    pub fn zero_extend(&self, width: u32) -> Result<Expr> {
        self.check_extension(width)?;
        Ok(Expr::from_op(width, Op::Zext(self.clone())))
    }

    /// Sign extension to a larger or equal width
    pub fn sign_extend(&self, width: u32) -> Result<Expr> {
        self.check_extension(width)?;
        Ok(Expr::from_op(width, Op::Sext(self.clone())))
    }

    fn check_same_width(&self, other: &Expr, op: &str) -> Result<()> {
        if self.width() != other.width() {
            Err(Error::backend(format!(
                "{op} of expressions with widths {} and {}",
                self.width(),
                other.width()
            )))
        } else {
            Ok(())
        }
    }

    fn check_extension(&self, width: u32) -> Result<()> {
        check_width(width)?;
        if width < self.width() {
            Err(Error::backend(format!(
                "cannot extend {} bits to {width} bits",
                self.width()
            )))
        } else {
            Ok(())
        }
    }

    /// Returns true if both expressions are the same shared node
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identity of the shared node, stable while the expression is alive
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Names of the free variables
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut ret = BTreeSet::new();
        for e in self.nodes() {
            if let Op::Var(n) = e.op() {
                ret.insert(n.to_string());
            }
        }
        ret
    }

    /// Number of distinct nodes in the DAG
    pub fn size(&self) -> usize {
        self.nodes().len()
    }

    /// All distinct nodes, each visited once
    fn nodes(&self) -> Vec<Expr> {
        let mut visited = FxHashSet::default();
        let mut to_visit = vec![self.clone()];
        let mut ret = Vec::new();
        while let Some(e) = to_visit.pop() {
            if !visited.insert(e.id()) {
                continue;
            }
            to_visit.extend(e.operands().into_iter().cloned());
            ret.push(e);
        }
        ret
    }

    /// Direct operands of the root
    pub fn operands(&self) -> Vec<&Expr> {
        match self.op() {
            Op::Const(_) | Op::Var(_) => Vec::new(),
            Op::Not(a) | Op::Zext(a) | Op::Sext(a) => vec![a],
            Op::And(a, b) | Op::Or(a, b) | Op::Xor(a, b) | Op::Concat(a, b) => vec![a, b],
        }
    }

    /// Parse a single-bit Boolean function, such as `!(A & B) ^ C`
    ///
    /// Operators are `!` or `~`, `&`, `^` and `|`, by decreasing precedence.
    /// `0` and `1` are constants; any other identifier is a variable.
    pub fn parse(s: &str) -> Result<Expr> {
        parse::parse(s)
    }
}

/// Structural equality, linear in the size of shared DAGs
fn structurally_equal(a: &Expr, b: &Expr, seen: &mut FxHashSet<(usize, usize)>) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    if a.width() != b.width() {
        return false;
    }
    if seen.contains(&(a.id(), b.id())) {
        return true;
    }
    let eq = match (a.op(), b.op()) {
        (Op::Const(x), Op::Const(y)) => x == y,
        (Op::Var(x), Op::Var(y)) => x == y,
        (Op::Not(x), Op::Not(y)) | (Op::Zext(x), Op::Zext(y)) | (Op::Sext(x), Op::Sext(y)) => {
            structurally_equal(x, y, seen)
        }
        (Op::And(a0, a1), Op::And(b0, b1))
        | (Op::Or(a0, a1), Op::Or(b0, b1))
        | (Op::Xor(a0, a1), Op::Xor(b0, b1))
        | (Op::Concat(a0, a1), Op::Concat(b0, b1)) => {
            structurally_equal(a0, b0, seen) && structurally_equal(a1, b1, seen)
        }
        _ => false,
    };
    if eq {
        seen.insert((a.id(), b.id()));
    }
    eq
}

impl PartialEq for Expr {
    fn eq(&self, other: &Expr) -> bool {
        let mut seen = FxHashSet::default();
        structurally_equal(self, other, &mut seen)
    }
}

impl Eq for Expr {}

fn expect_same_width(r: Result<Expr>) -> Expr {
    match r {
        Ok(e) => e,
        Err(e) => panic!("{e}"),
    }
}

impl Not for &'_ Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::from_op(self.width(), Op::Not(self.clone()))
    }
}

impl Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        !&self
    }
}

/// Panics if the widths differ; use [`Expr::and`] for a checked version
impl BitAnd for &'_ Expr {
    type Output = Expr;
    fn bitand(self, rhs: &Expr) -> Expr {
        expect_same_width(self.and(rhs))
    }
}

impl BitAnd for Expr {
    type Output = Expr;
    fn bitand(self, rhs: Expr) -> Expr {
        &self & &rhs
    }
}

/// Panics if the widths differ; use [`Expr::or`] for a checked version
impl BitOr for &'_ Expr {
    type Output = Expr;
    fn bitor(self, rhs: &Expr) -> Expr {
        expect_same_width(self.or(rhs))
    }
}

impl BitOr for Expr {
    type Output = Expr;
    fn bitor(self, rhs: Expr) -> Expr {
        &self | &rhs
    }
}

/// Panics if the widths differ; use [`Expr::xor`] for a checked version
impl BitXor for &'_ Expr {
    type Output = Expr;
    fn bitxor(self, rhs: &Expr) -> Expr {
        expect_same_width(self.xor(rhs))
    }
}

impl BitXor for Expr {
    type Output = Expr;
    fn bitxor(self, rhs: Expr) -> Expr {
        &self ^ &rhs
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op() {
            Op::Const(v) => {
                if self.width() == 1 {
                    write!(f, "{v}")
                } else {
                    write!(f, "{}'h{v:x}", self.width())
                }
            }
            Op::Var(n) => write!(f, "{n}"),
            Op::Not(a) => write!(f, "!{a}"),
            Op::And(a, b) => write!(f, "({a} & {b})"),
            Op::Or(a, b) => write!(f, "({a} | {b})"),
            Op::Xor(a, b) => write!(f, "({a} ^ {b})"),
            Op::Concat(a, b) => write!(f, "{{{a}, {b}}}"),
            Op::Zext(a) => write!(f, "zext({a}, {})", self.width()),
            Op::Sext(a) => write!(f, "sext({a}, {})", self.width()),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
