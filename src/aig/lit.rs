use std::fmt;
use std::ops::{BitXor, BitXorAssign, Not};

/// A literal of the graph: a node or its complement
///
/// Node 0 is the constant zero, so the literals 0 and 1 are the constants.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default)]
pub struct Lit {
    a: u32,
}

impl Lit {
    /// Constant zero
    pub fn zero() -> Lit {
        Lit { a: 0 }
    }

    /// Constant one
    pub fn one() -> Lit {
        Lit { a: 1 }
    }

    /// Positive literal of a node
    pub(crate) fn from_node(n: u32) -> Lit {
        assert!(n < 0x8000_0000, "Too many nodes in the graph");
        Lit { a: n << 1 }
    }

    /// Index of the node
    pub fn node(&self) -> u32 {
        self.a >> 1
    }

    /// Returns true if the literal is a constant
    pub fn is_constant(&self) -> bool {
        self.node() == 0
    }

    /// Value of the literal if it is a constant
    pub fn constant_value(&self) -> Option<bool> {
        if self.is_constant() {
            Some(self.is_inverted())
        } else {
            None
        }
    }

    /// Returns true if the literal is complemented
    ///
    /// True for one, false for zero.
    pub fn is_inverted(&self) -> bool {
        self.a & 1 != 0
    }

    /// Clear the complement, if set
    pub(crate) fn without_inversion(&self) -> Lit {
        Lit { a: self.a & !1u32 }
    }

    /// Return the internal representation of the literal
    pub fn raw(&self) -> u32 {
        self.a
    }
}

impl From<bool> for Lit {
    fn from(b: bool) -> Lit {
        if b {
            Lit::one()
        } else {
            Lit::zero()
        }
    }
}

impl Not for Lit {
    type Output = Lit;
    fn not(self) -> Lit {
        Lit { a: self.a ^ 1u32 }
    }
}

impl BitXorAssign<bool> for Lit {
    fn bitxor_assign(&mut self, rhs: bool) {
        self.a ^= rhs as u32;
    }
}

impl BitXor<bool> for Lit {
    type Output = Lit;
    fn bitxor(self, rhs: bool) -> Self::Output {
        let mut l = self;
        l ^= rhs;
        l
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constant() {
            write!(f, "{}", self.is_inverted() as u32)
        } else {
            if self.is_inverted() {
                write!(f, "!")?;
            }
            write!(f, "x{}", self.node())
        }
    }
}

impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
