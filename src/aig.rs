//! And-Xor graph backend
//!
//! Expressions are [`Word`]s, vectors of literals into a shared, structurally hashed graph
//! owned by an [`AigContext`]. Every construction goes through the context, which normalizes
//! nodes the same way for all callers: two equivalent constructions from the same operands
//! give the same literal.

mod context;
mod lit;
mod node;

pub use context::{AigContext, Word};
pub use lit::Lit;
pub use node::Node;
