use std::collections::BTreeSet;
use std::fmt;

use fxhash::FxHashMap;
use itertools::Itertools;

use crate::aig::lit::Lit;
use crate::aig::node::{make_and, make_xor, Node, Normalization};
use crate::error::{Error, Result};
use crate::expr::{check_width, mask, Expr, Op};

/// A bit-vector of literals, least significant bit first
///
/// A word is only meaningful with the [`AigContext`] that built it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Word {
    bits: Box<[Lit]>,
}

impl Word {
    /// Create a word from its bits, least significant first
    pub fn from_bits(bits: Vec<Lit>) -> Word {
        assert!(!bits.is_empty(), "Empty word");
        Word { bits: bits.into() }
    }

    /// Width in bits
    pub fn width(&self) -> u32 {
        self.bits.len() as u32
    }

    /// All bits, least significant first
    pub fn bits(&self) -> &[Lit] {
        &self.bits
    }

    /// Get the bit at index i
    pub fn bit(&self, i: usize) -> Lit {
        self.bits[i]
    }

    /// Value of the word if all its bits are constant
    pub fn constant_value(&self) -> Option<u64> {
        let mut ret = 0;
        for (i, b) in self.bits.iter().enumerate() {
            ret |= (b.constant_value()? as u64) << i;
        }
        Some(ret)
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.bits.iter().rev().join(", "))
    }
}

/// A hash-consed And-Xor graph with complemented edges
///
/// Nodes only refer to nodes with smaller indices, so the index order is a topological order.
/// Variables are vectors of input nodes, one per bit, identified by name and bit index.
#[derive(Debug, Clone)]
pub struct AigContext {
    nodes: Vec<Node>,
    strash: FxHashMap<Node, u32>,
    inputs: Vec<(String, u32)>,
    input_lookup: FxHashMap<(String, u32), Lit>,
    widths: FxHashMap<String, u32>,
}

impl Default for AigContext {
    fn default() -> Self {
        AigContext {
            nodes: vec![Node::Const],
            strash: FxHashMap::default(),
            inputs: Vec::new(),
            input_lookup: FxHashMap::default(),
            widths: FxHashMap::default(),
        }
    }
}

impl AigContext {
    /// Create a context containing only the constant node
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of nodes, including the constant and the inputs
    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of input bits
    pub fn nb_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Get the node of a literal
    pub fn node(&self, l: Lit) -> &Node {
        &self.nodes[l.node() as usize]
    }

    /// Variable name and bit index of an input literal
    pub fn input_name(&self, l: Lit) -> Option<(&str, u32)> {
        match self.node(l) {
            Node::Input(i) => {
                let (name, bit) = &self.inputs[*i as usize];
                Some((name.as_str(), *bit))
            }
            _ => None,
        }
    }

    fn add_node(&mut self, node: Node) -> Lit {
        if let Some(i) = self.strash.get(&node) {
            return Lit::from_node(*i);
        }
        let i = self.nodes.len() as u32;
        self.nodes.push(node);
        self.strash.insert(node, i);
        Lit::from_node(i)
    }

    fn add_canonical(&mut self, n: Normalization) -> Lit {
        match n {
            Normalization::Copy(l) => l,
            Normalization::Node(node, inv) => self.add_node(node) ^ inv,
        }
    }

    /// Create a named variable, or return the existing one
    ///
    /// A name is always used with the same width.
    pub fn variable(&mut self, name: &str, width: u32) -> Result<Word> {
        check_width(width)?;
        match self.widths.get(name) {
            Some(w) if *w != width => {
                return Err(Error::backend(format!(
                    "variable '{name}' already has width {w}, not {width}"
                )));
            }
            Some(_) => (),
            None => {
                self.widths.insert(name.to_string(), width);
            }
        }
        let bits = (0..width).map(|bit| self.input_bit(name, bit)).collect();
        Ok(Word::from_bits(bits))
    }

    fn input_bit(&mut self, name: &str, bit: u32) -> Lit {
        let key = (name.to_string(), bit);
        if let Some(l) = self.input_lookup.get(&key) {
            return *l;
        }
        let l = self.add_node(Node::Input(self.inputs.len() as u32));
        self.inputs.push(key.clone());
        self.input_lookup.insert(key, l);
        l
    }

    /// Create a constant word
    pub fn constant(&mut self, width: u32, value: u64) -> Result<Word> {
        check_width(width)?;
        if value & !mask(width) != 0 {
            return Err(Error::backend(format!(
                "constant {value:#x} does not fit in {width} bits"
            )));
        }
        Ok(constant_word(width, value))
    }

    /// Create an And2
    pub fn and(&mut self, a: Lit, b: Lit) -> Lit {
        self.add_canonical(make_and(a, b))
    }

    /// Create an Or2
    pub fn or(&mut self, a: Lit, b: Lit) -> Lit {
        !self.and(!a, !b)
    }

    /// Create a Xor2
    pub fn xor(&mut self, a: Lit, b: Lit) -> Lit {
        self.add_canonical(make_xor(a, b))
    }

    fn bitwise(&mut self, a: &Word, b: &Word, op: fn(&mut Self, Lit, Lit) -> Lit) -> Result<Word> {
        if a.width() != b.width() {
            return Err(Error::backend(format!(
                "bitwise operation on words with widths {} and {}",
                a.width(),
                b.width()
            )));
        }
        let bits = a
            .bits
            .iter()
            .zip(b.bits.iter())
            .map(|(x, y)| op(self, *x, *y))
            .collect();
        Ok(Word::from_bits(bits))
    }

    /// Bitwise And of two words
    pub fn and_word(&mut self, a: &Word, b: &Word) -> Result<Word> {
        self.bitwise(a, b, Self::and)
    }

    /// Bitwise Or of two words
    pub fn or_word(&mut self, a: &Word, b: &Word) -> Result<Word> {
        self.bitwise(a, b, Self::or)
    }

    /// Bitwise Xor of two words
    pub fn xor_word(&mut self, a: &Word, b: &Word) -> Result<Word> {
        self.bitwise(a, b, Self::xor)
    }

    /// Bitwise complement of a word
    pub fn not_word(&self, a: &Word) -> Word {
        Word::from_bits(a.bits.iter().map(|b| !*b).collect())
    }

    /// Concatenation, with `hi` as the most significant part
    pub fn concat(&self, hi: &Word, lo: &Word) -> Result<Word> {
        check_width(hi.width() + lo.width())?;
        let bits = lo.bits.iter().chain(hi.bits.iter()).copied().collect();
        Ok(Word::from_bits(bits))
    }

    fn extend(&self, a: &Word, width: u32, fill: Lit) -> Result<Word> {
        check_width(width)?;
        if width < a.width() {
            return Err(Error::backend(format!(
                "cannot extend {} bits to {width} bits",
                a.width()
            )));
        }
        let mut bits = a.bits.to_vec();
        bits.resize(width as usize, fill);
        Ok(Word::from_bits(bits))
    }

    /// Zero extension to a larger or equal width
    pub fn zero_extend(&self, a: &Word, width: u32) -> Result<Word> {
        self.extend(a, width, Lit::zero())
    }

    /// Sign extension to a larger or equal width
    pub fn sign_extend(&self, a: &Word, width: u32) -> Result<Word> {
        let msb = a.bit(a.bits.len() - 1);
        self.extend(a, width, msb)
    }

    /// Node indices in the transitive fanin of the literals, in increasing order
    fn cone(&self, roots: &[Lit]) -> Vec<u32> {
        let mut visited = vec![false; self.nodes.len()];
        let mut to_visit: Vec<u32> = roots.iter().map(|l| l.node()).collect();
        while let Some(n) = to_visit.pop() {
            if visited[n as usize] {
                continue;
            }
            visited[n as usize] = true;
            if let Some((a, b)) = self.nodes[n as usize].operands() {
                to_visit.push(a.node());
                to_visit.push(b.node());
            }
        }
        (0..self.nodes.len() as u32)
            .filter(|n| visited[*n as usize])
            .collect()
    }

    /// Names of the variables the word depends on structurally
    pub fn free_variable_names(&self, w: &Word) -> BTreeSet<String> {
        self.cone(w.bits())
            .into_iter()
            .filter_map(|n| match self.nodes[n as usize] {
                Node::Input(i) => Some(self.inputs[i as usize].0.clone()),
                _ => None,
            })
            .collect()
    }

    /// Replace the variables by the given words, rebuilding the transitive fanin
    pub fn substitute(&mut self, w: &Word, bindings: &FxHashMap<String, Word>) -> Result<Word> {
        for (name, b) in bindings {
            if let Some(width) = self.widths.get(name) {
                if *width != b.width() {
                    return Err(Error::backend(format!(
                        "cannot substitute {} bits for variable '{name}' of {width} bits",
                        b.width()
                    )));
                }
            }
        }
        let mut translation: FxHashMap<u32, Lit> = FxHashMap::default();
        let remap = |t: &FxHashMap<u32, Lit>, l: Lit| t[&l.node()] ^ l.is_inverted();
        for n in self.cone(w.bits()) {
            let node = self.nodes[n as usize];
            let new_lit = match node {
                Node::Const => Lit::zero(),
                Node::Input(i) => {
                    let (name, bit) = &self.inputs[i as usize];
                    match bindings.get(name) {
                        Some(b) => b.bit(*bit as usize),
                        None => Lit::from_node(n),
                    }
                }
                Node::And(a, b) => {
                    let (a, b) = (remap(&translation, a), remap(&translation, b));
                    self.and(a, b)
                }
                Node::Xor(a, b) => {
                    let (a, b) = (remap(&translation, a), remap(&translation, b));
                    self.xor(a, b)
                }
            };
            translation.insert(n, new_lit);
        }
        let bits = w.bits.iter().map(|l| remap(&translation, *l)).collect();
        Ok(Word::from_bits(bits))
    }

    /// Evaluate a word for an assignment of all its variables
    pub fn evaluate(&self, w: &Word, assignment: &FxHashMap<String, u64>) -> Result<u64> {
        let mut values: FxHashMap<u32, bool> = FxHashMap::default();
        let value = |v: &FxHashMap<u32, bool>, l: Lit| v[&l.node()] ^ l.is_inverted();
        for n in self.cone(w.bits()) {
            let v = match self.nodes[n as usize] {
                Node::Const => false,
                Node::Input(i) => {
                    let (name, bit) = &self.inputs[i as usize];
                    match assignment.get(name) {
                        Some(x) => (x >> bit) & 1 != 0,
                        None => {
                            return Err(Error::backend(format!(
                                "no value for variable '{name}'"
                            )))
                        }
                    }
                }
                Node::And(a, b) => value(&values, a) & value(&values, b),
                Node::Xor(a, b) => value(&values, a) ^ value(&values, b),
            };
            values.insert(n, v);
        }
        let mut ret = 0;
        for (i, l) in w.bits.iter().enumerate() {
            ret |= (value(&values, *l) as u64) << i;
        }
        Ok(ret)
    }

    /// Translate a native expression, replacing its bound variables by words
    ///
    /// Unbound variables become variables of the context.
    pub fn lower(&mut self, e: &Expr, bindings: &FxHashMap<String, Word>) -> Result<Word> {
        let mut memo = FxHashMap::default();
        self.lower_rec(e, bindings, &mut memo)
    }

    fn lower_rec(
        &mut self,
        e: &Expr,
        bindings: &FxHashMap<String, Word>,
        memo: &mut FxHashMap<usize, Word>,
    ) -> Result<Word> {
        if let Some(w) = memo.get(&e.id()) {
            return Ok(w.clone());
        }
        let w = match e.op() {
            Op::Const(v) => constant_word(e.width(), *v),
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
                None => self.variable(name, e.width())?,
            },
            Op::Not(a) => {
                let a = self.lower_rec(a, bindings, memo)?;
                self.not_word(&a)
            }
            Op::And(a, b) => {
                let a = self.lower_rec(a, bindings, memo)?;
                let b = self.lower_rec(b, bindings, memo)?;
                self.and_word(&a, &b)?
            }
            Op::Or(a, b) => {
                let a = self.lower_rec(a, bindings, memo)?;
                let b = self.lower_rec(b, bindings, memo)?;
                self.or_word(&a, &b)?
            }
            Op::Xor(a, b) => {
                let a = self.lower_rec(a, bindings, memo)?;
                let b = self.lower_rec(b, bindings, memo)?;
                self.xor_word(&a, &b)?
            }
            Op::Concat(a, b) => {
                let a = self.lower_rec(a, bindings, memo)?;
                let b = self.lower_rec(b, bindings, memo)?;
                self.concat(&a, &b)?
            }
            Op::Zext(a) => {
                let a = self.lower_rec(a, bindings, memo)?;
                self.zero_extend(&a, e.width())?
            }
            Op::Sext(a) => {
                let a = self.lower_rec(a, bindings, memo)?;
                self.sign_extend(&a, e.width())?
            }
        };
        memo.insert(e.id(), w.clone());
        Ok(w)
    }
}

fn constant_word(width: u32, value: u64) -> Word {
    Word::from_bits(
        (0..width)
            .map(|i| Lit::from((value >> i) & 1 != 0))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, u64)]) -> FxHashMap<String, u64> {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn test_strash() {
        let mut ctx = AigContext::new();
        let a = ctx.variable("a", 1).unwrap().bit(0);
        let b = ctx.variable("b", 1).unwrap().bit(0);
        let n = ctx.nb_nodes();
        let x = ctx.and(a, b);
        let y = ctx.and(b, a);
        assert_eq!(x, y);
        assert_eq!(ctx.nb_nodes(), n + 1);
        assert_eq!(ctx.and(a, !a), Lit::zero());
        assert_eq!(ctx.xor(a, a), Lit::zero());
        assert_eq!(ctx.xor(!a, b), !ctx.xor(a, b));
        assert_eq!(ctx.or(a, Lit::one()), Lit::one());
        // Same variable twice gives the same inputs
        assert_eq!(ctx.variable("a", 1).unwrap().bit(0), a);
        assert!(ctx.variable("a", 2).is_err());
        assert_eq!(ctx.input_name(a), Some(("a", 0)));
        assert_eq!(ctx.input_name(x), None);
    }

    #[test]
    fn test_words() {
        let mut ctx = AigContext::new();
        let v = ctx.variable("v", 4).unwrap();
        let c = ctx.constant(4, 0b0101).unwrap();
        assert_eq!(c.constant_value(), Some(0b0101));
        assert!(ctx.constant(4, 0x10).is_err());
        let x = ctx.xor_word(&v, &c).unwrap();
        assert_eq!(x.width(), 4);
        let s = ctx.sign_extend(&x, 8).unwrap();
        let z = ctx.zero_extend(&x, 8).unwrap();
        for val in 0..16u64 {
            let asg = values(&[("v", val)]);
            let xv = val ^ 0b0101;
            assert_eq!(ctx.evaluate(&x, &asg).unwrap(), xv);
            assert_eq!(ctx.evaluate(&z, &asg).unwrap(), xv);
            let sv = if xv & 8 != 0 { xv | 0xf0 } else { xv };
            assert_eq!(ctx.evaluate(&s, &asg).unwrap(), sv);
        }
        let a = ctx.variable("a", 1).unwrap();
        assert!(ctx.and_word(&a, &v).is_err());
        let cat = ctx.concat(&a, &v).unwrap();
        assert_eq!(ctx.evaluate(&cat, &values(&[("a", 1), ("v", 3)])).unwrap(), 0x13);
        assert!(ctx.evaluate(&cat, &values(&[("a", 1)])).is_err());
    }

    #[test]
    fn test_substitute() {
        let mut ctx = AigContext::new();
        let a = ctx.variable("a", 1).unwrap();
        let b = ctx.variable("b", 1).unwrap();
        let f = ctx.and_word(&a, &b).unwrap();
        let nb = ctx.not_word(&b);
        let bindings = [("a".to_string(), nb)].into_iter().collect();
        let g = ctx.substitute(&f, &bindings).unwrap();
        // !b & b
        assert_eq!(g.constant_value(), Some(0));
        let names: Vec<_> = ctx.free_variable_names(&f).into_iter().collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        let wide = ctx.variable("w", 2).unwrap();
        let bad = [("a".to_string(), wide)].into_iter().collect();
        assert!(ctx.substitute(&f, &bad).is_err());
    }

    #[test]
    fn test_lower() {
        let mut ctx = AigContext::new();
        let f = Expr::parse("(A & B) | (A & C) | (B & C)").unwrap();
        let w = ctx.lower(&f, &FxHashMap::default()).unwrap();
        for i in 0..8u64 {
            let asg = values(&[("A", i & 1), ("B", (i >> 1) & 1), ("C", (i >> 2) & 1)]);
            assert_eq!(
                ctx.evaluate(&w, &asg).unwrap(),
                f.evaluate(&asg).unwrap()
            );
        }
        // Binding a variable to a constant folds the graph
        let one = ctx.constant(1, 1).unwrap();
        let bindings = [("A".to_string(), one.clone()), ("B".to_string(), one)]
            .into_iter()
            .collect();
        let w = ctx.lower(&f, &bindings).unwrap();
        assert_eq!(w.constant_value(), Some(1));
    }
}
