//! Single-threaded subgraph compiler

use std::collections::BTreeSet;

use fxhash::{FxHashMap, FxHashSet};

use crate::backend::ExpressionBackend;
use crate::codec;
use crate::compile::CompileOptions;
use crate::error::{Error, Result};
use crate::netlist::{NetId, Netlist};
use crate::resolve::GateFunctionCache;
use crate::subgraph::{Membership, Subgraph};

/// Compiler for the functions of nets over a subgraph
///
/// The subgraph is validated once, at construction. Each call then walks the netlist backwards
/// from the requested outputs, expanding the gates of the subgraph and stopping at its boundary.
pub struct SubgraphCompiler<'a> {
    netlist: &'a Netlist,
    membership: Membership<'a>,
    options: CompileOptions,
}

impl<'a> SubgraphCompiler<'a> {
    /// Create a compiler; fails if the subgraph is empty or refers to missing gates
    pub fn new(
        netlist: &'a Netlist,
        subgraph: &Subgraph<'a>,
        options: CompileOptions,
    ) -> Result<SubgraphCompiler<'a>> {
        Ok(SubgraphCompiler {
            netlist,
            membership: subgraph.membership(netlist)?,
            options,
        })
    }

    /// The netlist being compiled
    pub fn netlist(&self) -> &'a Netlist {
        self.netlist
    }

    /// Options of the compiler
    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Compile the function of one net
    pub fn compile<B: ExpressionBackend>(&self, backend: &mut B, output: NetId) -> Result<B::Expr> {
        self.compile_with_cache(backend, &mut GateFunctionCache::new(), output)
    }

    /// Compile the function of one net, reusing previously resolved gate functions
    pub fn compile_with_cache<B: ExpressionBackend>(
        &self,
        backend: &mut B,
        gate_functions: &mut GateFunctionCache,
        output: NetId,
    ) -> Result<B::Expr> {
        let mut run = Run::new(self, backend, gate_functions);
        run.compile_output(output)
    }

    /// Compile the functions of several nets, sharing the expansion of common logic
    pub fn compile_many<B: ExpressionBackend>(
        &self,
        backend: &mut B,
        outputs: &[NetId],
    ) -> Result<Vec<B::Expr>> {
        self.compile_many_with_cache(backend, &mut GateFunctionCache::new(), outputs)
    }

    /// Compile the functions of several nets, reusing previously resolved gate functions
    pub fn compile_many_with_cache<B: ExpressionBackend>(
        &self,
        backend: &mut B,
        gate_functions: &mut GateFunctionCache,
        outputs: &[NetId],
    ) -> Result<Vec<B::Expr>> {
        log::debug!("compiling {} outputs", outputs.len());
        let mut run = Run::new(self, backend, gate_functions);
        let ret = outputs
            .iter()
            .map(|o| run.compile_output(*o))
            .collect::<Result<Vec<_>>>()?;
        log::trace!(
            "{} nets expanded, gate functions: {} resolved, {} hits",
            run.net_cache.len(),
            run.gate_functions.resolutions(),
            run.gate_functions.hits()
        );
        Ok(ret)
    }

    /// Boundary nets the function of a net may depend on
    pub fn inputs(&self, output: NetId) -> Result<BTreeSet<NetId>> {
        let mut walk = InputWalk {
            compiler: self,
            gate_functions: GateFunctionCache::new(),
            visited: FxHashSet::default(),
            on_stack: FxHashSet::default(),
            inputs: BTreeSet::new(),
        };
        self.netlist
            .net(output)
            .and_then(|_| walk.visit(output))
            .map_err(|e| e.in_output(output))?;
        Ok(walk.inputs)
    }

    /// Apply the post-processing requested by the options
    pub(crate) fn finish<B: ExpressionBackend>(
        &self,
        backend: &mut B,
        expr: B::Expr,
    ) -> Result<B::Expr> {
        if self.options.substitute_constant_sources {
            codec::substitute_constant_sources(backend, self.netlist, &expr)
        } else {
            Ok(expr)
        }
    }

    pub(crate) fn membership(&self) -> &Membership<'a> {
        &self.membership
    }
}

/// State of one compilation call
struct Run<'c, 'a, B: ExpressionBackend> {
    compiler: &'c SubgraphCompiler<'a>,
    backend: &'c mut B,
    gate_functions: &'c mut GateFunctionCache,
    net_cache: FxHashMap<NetId, B::Expr>,
    on_stack: FxHashSet<NetId>,
}

impl<'c, 'a, B: ExpressionBackend> Run<'c, 'a, B> {
    fn new(
        compiler: &'c SubgraphCompiler<'a>,
        backend: &'c mut B,
        gate_functions: &'c mut GateFunctionCache,
    ) -> Self {
        Run {
            compiler,
            backend,
            gate_functions,
            net_cache: FxHashMap::default(),
            on_stack: FxHashSet::default(),
        }
    }

    fn compile_output(&mut self, output: NetId) -> Result<B::Expr> {
        self.compile_unwrapped(output).map_err(|e| e.in_output(output))
    }

    fn compile_unwrapped(&mut self, output: NetId) -> Result<B::Expr> {
        self.compiler.netlist.net(output)?;
        let e = self.expand(output)?;
        self.compiler.finish(self.backend, e)
    }

    fn expand(&mut self, net: NetId) -> Result<B::Expr> {
        if let Some(e) = self.net_cache.get(&net) {
            return Ok(e.clone());
        }
        if self.on_stack.contains(&net) {
            log::warn!("combinational cycle through net {net}");
            return Err(Error::CombinationalCycle(net));
        }
        let netlist = self.compiler.netlist;
        let ret = match self.compiler.membership.driver(netlist, net)? {
            None => self.backend.make_variable(&codec::encode(net), 1)?,
            Some(driver) => {
                self.on_stack.insert(net);
                let function = self.gate_functions.resolve(netlist, driver.gate, &driver.pin)?;
                let mut bindings = FxHashMap::default();
                for name in function.free_variables() {
                    let input = codec::decode(&name, netlist)?;
                    let e = self.expand(input)?;
                    bindings.insert(name, e);
                }
                let simplified = self.backend.lower_simplified(&function, &bindings)?;
                self.on_stack.remove(&net);
                simplified
            }
        };
        self.net_cache.insert(net, ret.clone());
        Ok(ret)
    }
}

/// Structural traversal for [`SubgraphCompiler::inputs`]
struct InputWalk<'c, 'a> {
    compiler: &'c SubgraphCompiler<'a>,
    gate_functions: GateFunctionCache,
    visited: FxHashSet<NetId>,
    on_stack: FxHashSet<NetId>,
    inputs: BTreeSet<NetId>,
}

impl InputWalk<'_, '_> {
    fn visit(&mut self, net: NetId) -> Result<()> {
        if self.visited.contains(&net) {
            return Ok(());
        }
        if self.on_stack.contains(&net) {
            log::warn!("combinational cycle through net {net}");
            return Err(Error::CombinationalCycle(net));
        }
        let netlist = self.compiler.netlist;
        match self.compiler.membership.driver(netlist, net)? {
            None => {
                self.inputs.insert(net);
            }
            Some(driver) => {
                self.on_stack.insert(net);
                let function = self.gate_functions.resolve(netlist, driver.gate, &driver.pin)?;
                for name in function.free_variables() {
                    self.visit(codec::decode(&name, netlist)?)?;
                }
                self.on_stack.remove(&net);
            }
        }
        self.visited.insert(net);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::AigContext;
    use crate::backend::ExprBackend;
    use crate::expr::Expr;
    use crate::netlist::generators::{adder, testcases};
    use crate::netlist::{GateLibrary, GateProperty};

    #[test]
    fn test_boundary_net() {
        let c = testcases::half_adder();
        let nl = &c.netlist;
        let compiler = SubgraphCompiler::new(
            nl,
            &Subgraph::Gates(&c.logic),
            CompileOptions::default(),
        )
        .unwrap();
        let a = c.inputs[0];
        let mut cache = GateFunctionCache::new();
        let e = compiler
            .compile_with_cache(&mut ExprBackend, &mut cache, a)
            .unwrap();
        assert_eq!(e, Expr::bit(&codec::encode(a)));
        assert_eq!(cache.resolutions(), 0);

        let mut ctx = AigContext::new();
        let w = compiler.compile_with_cache(&mut ctx, &mut cache, a).unwrap();
        assert_eq!(
            ctx.free_variable_names(&w).into_iter().collect::<Vec<_>>(),
            vec![codec::encode(a)]
        );
        assert_eq!(cache.resolutions(), 0);
    }

    #[test]
    fn test_excluded_driver() {
        let c = testcases::half_adder();
        let nl = &c.netlist;
        let xor_gate = nl.gate_by_name("xor2_0").unwrap();
        let not_xor = |g: &crate::netlist::Gate| g.id() != xor_gate;
        let compiler = SubgraphCompiler::new(
            nl,
            &Subgraph::Filter(&not_xor),
            CompileOptions::default(),
        )
        .unwrap();
        let mut cache = GateFunctionCache::new();
        let sum = c.outputs[0];
        let e = compiler
            .compile_with_cache(&mut ExprBackend, &mut cache, sum)
            .unwrap();
        assert_eq!(e, Expr::bit(&codec::encode(sum)));
        assert!(cache.get(xor_gate, "Y").is_none());
        assert_eq!(cache.resolutions(), 0);
    }

    #[test]
    fn test_shared_cache() {
        let c = adder::ripple_carry(8);
        let nl = &c.netlist;
        let compiler = SubgraphCompiler::new(
            nl,
            &Subgraph::combinational(),
            CompileOptions::default(),
        )
        .unwrap();
        let mut cache = GateFunctionCache::new();
        compiler
            .compile_many_with_cache(&mut ExprBackend, &mut cache, &c.outputs)
            .unwrap();
        // Every gate is resolved once, whichever output reaches it first
        assert_eq!(cache.resolutions(), nl.nb_gates());
        assert_eq!(cache.hits(), 0);

        // A second batch only hits the cache, even with another backend
        let mut ctx = AigContext::new();
        compiler
            .compile_many_with_cache(&mut ctx, &mut cache, &c.outputs)
            .unwrap();
        assert_eq!(cache.resolutions(), nl.nb_gates());
        assert_eq!(cache.hits(), nl.nb_gates());
    }

    #[test]
    fn test_cache_across_subgraphs() {
        let c = adder::ripple_carry(4);
        let nl = &c.netlist;
        let mut cache = GateFunctionCache::new();
        let full = SubgraphCompiler::new(
            nl,
            &Subgraph::combinational(),
            CompileOptions::default(),
        )
        .unwrap();
        let reference = full
            .compile_many_with_cache(&mut ExprBackend, &mut cache, &c.outputs)
            .unwrap();
        let no_gnd = |g: &crate::netlist::Gate| !g.has_property(GateProperty::Ground);
        let options = CompileOptions::default().with_constant_sources(true);
        let partial = SubgraphCompiler::new(nl, &Subgraph::Filter(&no_gnd), options).unwrap();
        let folded = partial
            .compile_many_with_cache(&mut ExprBackend, &mut cache, &c.outputs)
            .unwrap();
        assert_eq!(folded, reference);
    }

    #[test]
    fn test_unknown_output() {
        let c = testcases::half_adder();
        let compiler = SubgraphCompiler::new(
            &c.netlist,
            &Subgraph::combinational(),
            CompileOptions::default(),
        )
        .unwrap();
        let missing = NetId::from_raw(1000);
        let e = compiler.compile(&mut ExprBackend, missing).unwrap_err();
        assert_eq!(e.output(), Some(missing));
        assert!(matches!(e.root_cause(), Error::NullReference(_)));
        assert!(compiler.inputs(missing).is_err());
        assert!(SubgraphCompiler::new(
            &c.netlist,
            &Subgraph::Gates(&[crate::netlist::GateId::from_raw(1000)]),
            CompileOptions::default()
        )
        .is_err());
    }

    #[test]
    fn test_sequential_boundary() {
        // A flip-flop has no function: it must be kept out of the subgraph
        let lib = GateLibrary::standard();
        let c = testcases::shift_register(2);
        let nl = &c.netlist;
        let q = *c.outputs.last().unwrap();
        let all = |_: &crate::netlist::Gate| true;
        let compiler = SubgraphCompiler::new(
            nl,
            &Subgraph::Filter(&all),
            CompileOptions::default(),
        )
        .unwrap();
        let e = compiler.compile(&mut ExprBackend, q).unwrap_err();
        assert!(matches!(
            e.root_cause(),
            Error::MalformedGateType { gate_type, .. } if gate_type == "DFF"
        ));
        assert!(lib.get("DFF").unwrap().function("Q").is_none());

        let compiler = SubgraphCompiler::new(
            nl,
            &Subgraph::combinational(),
            CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(compiler.compile(&mut ExprBackend, q).unwrap(), Expr::bit(&codec::encode(q)));
    }

    #[test]
    fn test_deep_chain() {
        let c = testcases::inverter_chain(501);
        let compiler = SubgraphCompiler::new(
            &c.netlist,
            &Subgraph::Gates(&c.logic),
            CompileOptions::default(),
        )
        .unwrap();
        let out = *c.outputs.last().unwrap();
        let e = compiler.compile(&mut ExprBackend, out).unwrap();
        assert_eq!(e, !Expr::bit(&codec::encode(c.inputs[0])));
        assert_eq!(compiler.inputs(out).unwrap(), BTreeSet::from([c.inputs[0]]));
    }

    #[test]
    fn test_and_chain_sharing() {
        let len = 400;
        let c = testcases::and_chain(len);
        let compiler = SubgraphCompiler::new(
            &c.netlist,
            &Subgraph::combinational(),
            CompileOptions::default(),
        )
        .unwrap();
        let outs = compiler.compile_many(&mut ExprBackend, &c.outputs).unwrap();
        let expected = c
            .inputs
            .iter()
            .map(|&n| Expr::bit(&codec::encode(n)))
            .reduce(|x, y| x & y)
            .unwrap();
        let last = outs.last().unwrap();
        assert_eq!(*last, expected);
        assert_eq!(last.size(), 2 * len + 1);
        // Each output is built directly on top of the previous one
        for w in outs.windows(2) {
            assert!(w[1].operands()[0].ptr_eq(&w[0]));
        }
    }
}
