//! Multi-threaded subgraph compiler
//!
//! Workers claim requested outputs from a shared cursor and expand them with the same rules as
//! the serial compiler. Expanded nets are published in a table indexed by net id, so that logic
//! shared between outputs is built once; the backend and the gate function cache are behind a
//! single lock, only taken to build expressions.

use std::panic;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use fxhash::{FxHashMap, FxHashSet};

use crate::backend::ExpressionBackend;
use crate::codec;
use crate::compile::publish::PublishTable;
use crate::compile::{ParallelOptions, SubgraphCompiler};
use crate::error::{Error, Result};
use crate::netlist::{NetId, Netlist};
use crate::resolve::GateFunctionCache;
use crate::subgraph::Subgraph;

/// Compiler for the functions of many nets, using a pool of worker threads
///
/// A batch either succeeds for all outputs or returns the first error encountered.
pub struct ParallelSubgraphCompiler<'a> {
    compiler: SubgraphCompiler<'a>,
    options: ParallelOptions,
}

impl<'a> ParallelSubgraphCompiler<'a> {
    /// Create a compiler; fails if the subgraph is empty or refers to missing gates
    pub fn new(
        netlist: &'a Netlist,
        subgraph: &Subgraph<'a>,
        options: ParallelOptions,
    ) -> Result<ParallelSubgraphCompiler<'a>> {
        Ok(ParallelSubgraphCompiler {
            compiler: SubgraphCompiler::new(netlist, subgraph, options.compile)?,
            options,
        })
    }

    /// Options of the compiler
    pub fn options(&self) -> ParallelOptions {
        self.options
    }

    /// Compile the functions of several nets
    pub fn compile_many<B: ExpressionBackend + Send>(
        &self,
        backend: &mut B,
        outputs: &[NetId],
    ) -> Result<Vec<B::Expr>> {
        self.compile_many_with_cache(backend, &mut GateFunctionCache::new(), outputs)
    }

    /// Compile the functions of several nets, reusing previously resolved gate functions
    pub fn compile_many_with_cache<B: ExpressionBackend + Send>(
        &self,
        backend: &mut B,
        gate_functions: &mut GateFunctionCache,
        outputs: &[NetId],
    ) -> Result<Vec<B::Expr>> {
        let nb_workers = self.options.nb_workers(outputs.len());
        log::debug!(
            "compiling {} outputs with {} workers",
            outputs.len(),
            nb_workers
        );
        let shared = Shared {
            compiler: &self.compiler,
            outputs,
            table: PublishTable::new(self.compiler.netlist().nb_nets()),
            context: Mutex::new(Context {
                backend,
                gate_functions,
            }),
            cursor: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            error: Mutex::new(None),
        };
        let results = shared.run(nb_workers, self.options.stack_size)?;
        {
            let ctx = shared.lock();
            log::trace!(
                "{} nets published, gate functions: {} resolved, {} hits",
                shared.table.nb_published(),
                ctx.gate_functions.resolutions(),
                ctx.gate_functions.hits()
            );
        }

        let mut slots: Vec<Option<B::Expr>> = vec![None; outputs.len()];
        for (i, e) in results {
            slots[i] = Some(e);
        }
        Ok(slots
            .into_iter()
            .map(|e| e.expect("Every output is compiled when no worker fails"))
            .collect())
    }
}

/// The state behind the exclusive lock
struct Context<'b, B> {
    backend: &'b mut B,
    gate_functions: &'b mut GateFunctionCache,
}

/// State shared by the workers of one batch
struct Shared<'s, 'a, 'b, B: ExpressionBackend> {
    compiler: &'s SubgraphCompiler<'a>,
    outputs: &'s [NetId],
    table: PublishTable<B::Expr>,
    context: Mutex<Context<'b, B>>,
    cursor: AtomicUsize,
    stop: AtomicBool,
    error: Mutex<Option<Error>>,
}

impl<'b, B: ExpressionBackend + Send> Shared<'_, '_, 'b, B> {
    fn lock(&self) -> MutexGuard<'_, Context<'b, B>> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an error; only the first one is kept
    fn fail(&self, error: Error) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            log::debug!("stopping workers: {error}");
            *slot = Some(error);
        }
        self.stop.store(true, Ordering::Release);
    }

    /// Run the workers to completion; returns the compiled outputs with their index
    fn run(&self, nb_workers: usize, stack_size: Option<usize>) -> Result<Vec<(usize, B::Expr)>> {
        let results = thread::scope(|s| {
            let mut handles = Vec::with_capacity(nb_workers);
            let mut spawn_error = None;
            for i in 0..nb_workers {
                let mut builder = thread::Builder::new().name(format!("netfunc-worker-{i}"));
                if let Some(size) = stack_size {
                    builder = builder.stack_size(size);
                }
                match builder.spawn_scoped(s, move || Worker::new(self).run()) {
                    Ok(h) => handles.push(h),
                    Err(e) => {
                        self.stop.store(true, Ordering::Release);
                        spawn_error = Some(e);
                        break;
                    }
                }
            }
            let mut results = Vec::new();
            for h in handles {
                match h.join() {
                    Ok(r) => results.extend(r),
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            match spawn_error {
                Some(e) => Err(Error::WorkerSpawn(e)),
                None => Ok(results),
            }
        })?;
        let error = self
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}

/// One worker; the cycle tracking set is private to it
struct Worker<'w, 's, 'a, 'b, B: ExpressionBackend> {
    shared: &'w Shared<'s, 'a, 'b, B>,
    on_stack: FxHashSet<NetId>,
}

impl<'w, 's, 'a, 'b, B: ExpressionBackend + Send> Worker<'w, 's, 'a, 'b, B> {
    fn new(shared: &'w Shared<'s, 'a, 'b, B>) -> Self {
        Worker {
            shared,
            on_stack: FxHashSet::default(),
        }
    }

    fn run(mut self) -> Vec<(usize, B::Expr)> {
        let mut ret = Vec::new();
        while !self.shared.stop.load(Ordering::Acquire) {
            let i = self.shared.cursor.fetch_add(1, Ordering::Relaxed);
            let Some(&output) = self.shared.outputs.get(i) else {
                break;
            };
            match self.compile_output(output) {
                Ok(e) => ret.push((i, e)),
                Err(e) => {
                    self.shared.fail(e.in_output(output));
                    break;
                }
            }
        }
        ret
    }

    fn compile_output(&mut self, output: NetId) -> Result<B::Expr> {
        self.shared.compiler.netlist().net(output)?;
        let e = self.expand(output)?;
        let mut ctx = self.shared.lock();
        self.shared.compiler.finish(&mut *ctx.backend, e)
    }

    fn expand(&mut self, net: NetId) -> Result<B::Expr> {
        if let Some(e) = self.shared.table.get(net.index()) {
            return Ok(e.clone());
        }
        if self.on_stack.contains(&net) {
            log::warn!("combinational cycle through net {net}");
            return Err(Error::CombinationalCycle(net));
        }
        let netlist = self.shared.compiler.netlist();
        let ret = match self.shared.compiler.membership().driver(netlist, net)? {
            None => self
                .shared
                .lock()
                .backend
                .make_variable(&codec::encode(net), 1)?,
            Some(driver) => {
                self.on_stack.insert(net);
                let function = self
                    .shared
                    .lock()
                    .gate_functions
                    .resolve(netlist, driver.gate, &driver.pin)?;
                let mut bindings = FxHashMap::default();
                for name in function.free_variables() {
                    let input = codec::decode(&name, netlist)?;
                    let e = self.expand(input)?;
                    bindings.insert(name, e);
                }
                let simplified = self
                    .shared
                    .lock()
                    .backend
                    .lower_simplified(&function, &bindings)?;
                self.on_stack.remove(&net);
                simplified
            }
        };
        Ok(self.shared.table.publish(net.index(), ret).clone())
    }
}
