use crate::aig::lit::Lit;

/// A node of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    /// The constant zero, always node 0
    Const,
    /// A bit of a named variable, by index in the input table
    Input(u32),
    /// 2-input And
    And(Lit, Lit),
    /// 2-input Xor
    Xor(Lit, Lit),
}

/// Result of node normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// A node, with an optional inverted output
    Node(Node, bool),
    /// The trivial case, where the node reduces to a single literal or constant
    Copy(Lit),
}

impl Node {
    /// Operands of the node, if any
    pub fn operands(&self) -> Option<(Lit, Lit)> {
        match self {
            Node::And(a, b) | Node::Xor(a, b) => Some((*a, *b)),
            _ => None,
        }
    }
}

fn sort_2(a: Lit, b: Lit) -> (Lit, Lit) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Normalize an And
pub(crate) fn make_and(a: Lit, b: Lit) -> Normalization {
    let (i0, i1) = sort_2(a, b);
    if i0 == Lit::zero() || i0 == !i1 {
        Normalization::Copy(Lit::zero())
    } else if i0 == Lit::one() || i0 == i1 {
        Normalization::Copy(i1)
    } else {
        Normalization::Node(Node::And(i0, i1), false)
    }
}

/// Normalize a Xor; operands are never complemented
pub(crate) fn make_xor(a: Lit, b: Lit) -> Normalization {
    let inv = a.is_inverted() ^ b.is_inverted();
    let (i0, i1) = sort_2(a.without_inversion(), b.without_inversion());
    if i0 == Lit::zero() {
        Normalization::Copy(i1 ^ inv)
    } else if i0 == i1 {
        Normalization::Copy(Lit::from(inv))
    } else {
        Normalization::Node(Node::Xor(i0, i1), inv)
    }
}
