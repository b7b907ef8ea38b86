//! Compilation of subgraph functions
//!
//! Starting from an output net, the compilers walk the netlist backwards and build the function
//! of the net over the free variables of the subgraph: nets without driver, or driven by a gate
//! outside the subgraph.
//!
//! ```
//! # use netfunc::netlist::generators::testcases;
//! # use netfunc::{compile, Expr, ExprBackend, Subgraph};
//! let c = testcases::half_adder();
//! let sg = Subgraph::Gates(&c.logic);
//! let sum = compile(&mut ExprBackend, &c.netlist, &sg, c.outputs[0]).unwrap();
//! assert_eq!(sum, Expr::parse("net_0 ^ net_1").unwrap());
//! ```

mod parallel;
pub mod publish;
mod serial;

pub use parallel::ParallelSubgraphCompiler;
pub use serial::SubgraphCompiler;

use std::collections::BTreeSet;

use crate::backend::ExpressionBackend;
use crate::error::Result;
use crate::netlist::{NetId, Netlist};
use crate::subgraph::Subgraph;

/// Options of the subgraph compilers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Replace the variables of nets driven by power and ground cells by constants
    pub substitute_constant_sources: bool,
}

impl CompileOptions {
    /// Set whether constant sources are substituted
    pub fn with_constant_sources(mut self, substitute: bool) -> Self {
        self.substitute_constant_sources = substitute;
        self
    }
}

/// Options of the parallel subgraph compiler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParallelOptions {
    /// Number of worker threads; 0 uses one worker per logical CPU
    pub worker_count: usize,
    /// Stack size of the worker threads, for very deep logic
    pub stack_size: Option<usize>,
    /// Options shared with the serial compiler
    pub compile: CompileOptions,
}

impl ParallelOptions {
    /// Set the number of worker threads
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the stack size of the worker threads
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Set the options shared with the serial compiler
    pub fn with_compile_options(mut self, compile: CompileOptions) -> Self {
        self.compile = compile;
        self
    }

    /// Number of workers actually used for a batch
    pub(crate) fn nb_workers(&self, nb_outputs: usize) -> usize {
        let requested = if self.worker_count == 0 {
            num_cpus::get()
        } else {
            self.worker_count
        };
        requested.min(nb_outputs).max(1)
    }
}

/// Compile the function of one net
pub fn compile<B: ExpressionBackend>(
    backend: &mut B,
    netlist: &Netlist,
    subgraph: &Subgraph,
    output: NetId,
) -> Result<B::Expr> {
    SubgraphCompiler::new(netlist, subgraph, CompileOptions::default())?.compile(backend, output)
}

/// Compile the functions of several nets, sharing work between them
pub fn compile_many<B: ExpressionBackend>(
    backend: &mut B,
    netlist: &Netlist,
    subgraph: &Subgraph,
    outputs: &[NetId],
) -> Result<Vec<B::Expr>> {
    SubgraphCompiler::new(netlist, subgraph, CompileOptions::default())?
        .compile_many(backend, outputs)
}

/// Compile the functions of several nets with a pool of worker threads
///
/// The result is the same as [`compile_many`], up to simplification.
pub fn compile_many_parallel<B: ExpressionBackend + Send>(
    backend: &mut B,
    netlist: &Netlist,
    subgraph: &Subgraph,
    outputs: &[NetId],
    worker_count: usize,
) -> Result<Vec<B::Expr>> {
    let options = ParallelOptions::default().with_worker_count(worker_count);
    ParallelSubgraphCompiler::new(netlist, subgraph, options)?.compile_many(backend, outputs)
}

/// Boundary nets the function of a net may depend on
///
/// This is structural: the compiled function may not depend on all of them.
pub fn subgraph_inputs(
    netlist: &Netlist,
    subgraph: &Subgraph,
    output: NetId,
) -> Result<BTreeSet<NetId>> {
    SubgraphCompiler::new(netlist, subgraph, CompileOptions::default())?.inputs(output)
}
