//! Boolean function synthesis for gate-level netlists
//!
//! This crate computes the function of a net over a region of a netlist, the subgraph: starting
//! from the net, gates of the subgraph are expanded backwards until the boundary of the
//! subgraph is reached. Nets at the boundary, without driver or driven by a gate outside the
//! subgraph, become the free variables of the function.
//! The resulting functions are the basis for equivalence checking, influence analysis or
//! redundancy removal on reverse-engineered netlists.
//!
//! # Usage
//!
//! A netlist is built from gate types, whose output pins carry a Boolean function of the other
//! pins. The subgraph is given as an explicit list of gates, a predicate, or a gate property.
//!
//! ```
//! # use netfunc::netlist::{GateLibrary, Netlist};
//! # use netfunc::{compile, Expr, ExprBackend, Subgraph};
//! let lib = GateLibrary::standard();
//! let mut netlist = Netlist::new();
//! let a = netlist.create_net("a");
//! let b = netlist.create_net("b");
//! let c = netlist.create_net("c");
//! let y = netlist.create_net("y");
//! let z = netlist.create_net("z");
//! let nand = lib.get("NAND2").unwrap();
//! let g0 = netlist.instantiate(nand, "g0", &[("A", a), ("B", b)], &[("Y", y)]).unwrap();
//! let g1 = netlist.instantiate(nand, "g1", &[("A", y), ("B", c)], &[("Y", z)]).unwrap();
//!
//! // Expand both gates
//! let f = compile(&mut ExprBackend, &netlist, &Subgraph::Gates(&[g0, g1]), z).unwrap();
//! assert_eq!(f, Expr::parse("!(!(net_0 & net_1) & net_2)").unwrap());
//! // Stop at the output of the first gate
//! let f = compile(&mut ExprBackend, &netlist, &Subgraph::Gates(&[g1]), z).unwrap();
//! assert_eq!(f, Expr::parse("!(net_3 & net_2)").unwrap());
//! ```
//!
//! Variables are named after the net ids, as defined in [`codec`].
//!
//! # Backends
//!
//! The compilers are generic over an [`ExpressionBackend`]:
//! * [`ExprBackend`] builds native [`Expr`] DAGs, simplified by local rewriting;
//! * [`AigContext`] builds a structurally hashed And-Xor graph, where expressions are
//!   [`aig::Word`]s.
//!
//! For large batches of outputs, [`compile_many_parallel`] shares the expansion of common logic
//! between worker threads.

#![warn(missing_docs)]

pub mod aig;
pub mod backend;
pub mod codec;
pub mod compile;
pub mod equiv;
mod error;
pub mod expr;
pub mod netlist;
pub mod resolve;
pub mod subgraph;

pub use aig::AigContext;
pub use backend::{ExprBackend, ExpressionBackend};
pub use compile::{
    compile, compile_many, compile_many_parallel, subgraph_inputs, CompileOptions,
    ParallelOptions, ParallelSubgraphCompiler, SubgraphCompiler,
};
pub use error::{Error, Result};
pub use expr::Expr;
pub use netlist::{GateId, NetId, Netlist};
pub use resolve::GateFunctionCache;
pub use subgraph::Subgraph;
