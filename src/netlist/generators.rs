//! Netlist generators, used as test corpora

use crate::netlist::{GateId, GateLibrary, NetId, Netlist};

/// A generated netlist with its interface
#[derive(Debug, Clone)]
pub struct Circuit {
    /// The netlist
    pub netlist: Netlist,
    /// Nets without driver, in creation order
    pub inputs: Vec<NetId>,
    /// Interesting nets to compile
    pub outputs: Vec<NetId>,
    /// Combinational gates meant to form the subgraph
    pub logic: Vec<GateId>,
}

impl Circuit {
    fn new() -> Circuit {
        Circuit {
            netlist: Netlist::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            logic: Vec::new(),
        }
    }

    fn add_input(&mut self, name: &str) -> NetId {
        let n = self.netlist.create_net(name);
        self.inputs.push(n);
        n
    }

    /// Add a single-output gate of the standard library; returns its output net
    fn add_cell(
        &mut self,
        lib: &GateLibrary,
        cell: &str,
        inputs: &[NetId],
        in_logic: bool,
    ) -> NetId {
        let t = lib.get(cell).expect("Unknown standard cell");
        let pins = t.input_pins();
        assert_eq!(pins.len(), inputs.len());
        let name = format!("{}_{}", cell.to_lowercase(), self.netlist.nb_gates());
        let out = self.netlist.create_net(&format!("{name}_y"));
        let conns: Vec<(&str, NetId)> = pins.into_iter().zip(inputs.iter().copied()).collect();
        let g = self
            .netlist
            .instantiate(t, &name, &conns, &[("Y", out)])
            .expect("Generated connections are valid");
        if in_logic {
            self.logic.push(g);
        }
        out
    }
}

/// Adder generators
pub mod adder {
    use super::Circuit;
    use crate::netlist::GateLibrary;

    /// A ripple-carry adder built from majority and 3-input xor cells
    ///
    /// Inputs are `a0, b0, a1, b1, ...`; outputs are the sum bits followed by the carry out.
    /// The carry in is driven by a ground cell, part of the logic.
    pub fn ripple_carry(len: usize) -> Circuit {
        let lib = GateLibrary::standard();
        let mut ret = Circuit::new();
        let mut c = ret.add_cell(&lib, "GND", &[], true);
        for i in 0..len {
            let a = ret.add_input(&format!("a{i}"));
            let b = ret.add_input(&format!("b{i}"));
            let next_c = ret.add_cell(&lib, "MAJ3", &[a, b, c], true);
            let o = ret.add_cell(&lib, "XOR3", &[a, b, c], true);
            ret.outputs.push(o);
            c = next_c;
        }
        ret.outputs.push(c);
        ret
    }

    /// A ripple-carry adder built from full-adder cells, whose outputs share an internal pin
    ///
    /// Same interface as [`ripple_carry`], with a primary carry in `cin` as last input.
    pub fn ripple_carry_fa(len: usize) -> Circuit {
        let lib = GateLibrary::standard();
        let fa = lib.get("FA").expect("Full adder in the standard library");
        let mut ret = Circuit::new();
        let mut c = ret.add_input("cin");
        for i in 0..len {
            let a = ret.add_input(&format!("a{i}"));
            let b = ret.add_input(&format!("b{i}"));
            let s = ret.netlist.create_net(&format!("s{i}"));
            let co = ret.netlist.create_net(&format!("c{}", i + 1));
            let g = ret
                .netlist
                .instantiate(
                    fa,
                    &format!("fa{i}"),
                    &[("A", a), ("B", b), ("CI", c)],
                    &[("S", s), ("CO", co)],
                )
                .expect("Generated connections are valid");
            ret.logic.push(g);
            ret.outputs.push(s);
            c = co;
        }
        ret.outputs.push(c);
        // Keep the carry in last, as for the other adder
        ret.inputs.rotate_left(1);
        ret
    }
}

/// Simple generators to test functionality
pub mod testcases {
    use super::Circuit;
    use crate::netlist::GateLibrary;

    /// A half adder: `SUM = A ^ B` by an xor gate, `CARRY = A & B` by an and gate
    pub fn half_adder() -> Circuit {
        let lib = GateLibrary::standard();
        let mut ret = Circuit::new();
        let a = ret.add_input("A");
        let b = ret.add_input("B");
        let sum = ret.add_cell(&lib, "XOR2", &[a, b], true);
        let carry = ret.add_cell(&lib, "AND2", &[a, b], true);
        ret.outputs = vec![sum, carry];
        ret
    }

    /// A shift register whose stages xor the data input into the previous stage, gated by
    /// an active-low reset
    ///
    /// Inputs are `din`, `clk`, `rst`. The clock buffer, the reset inverter and the flip-flops
    /// are not part of the logic. Outputs are the data input of each flip-flop, then the last
    /// flip-flop output.
    pub fn shift_register(len: usize) -> Circuit {
        assert!(len > 0);
        let lib = GateLibrary::standard();
        let dff = lib.get("DFF").expect("Flip-flop in the standard library");
        let mut ret = Circuit::new();
        let din = ret.add_input("din");
        let clk = ret.add_input("clk");
        let rst = ret.add_input("rst");
        let clk_buf = ret.add_cell(&lib, "BUF", &[clk], false);
        let rst_n = ret.add_cell(&lib, "INV", &[rst], false);
        let mut q = None;
        for i in 0..len {
            let x = match q {
                None => din,
                Some(q) => ret.add_cell(&lib, "XOR2", &[q, din], true),
            };
            let d = ret.add_cell(&lib, "AND2", &[x, rst_n], true);
            let next_q = ret.netlist.create_net(&format!("q{i}"));
            ret.netlist
                .instantiate(
                    dff,
                    &format!("ff{i}"),
                    &[("D", d), ("CLK", clk_buf), ("RST", rst)],
                    &[("Q", next_q)],
                )
                .expect("Generated connections are valid");
            ret.outputs.push(d);
            q = Some(next_q);
        }
        ret.outputs.extend(q);
        ret
    }

    /// Two gates feeding each other: `x = and(a, y)` and `y = !x`
    pub fn combinational_loop() -> Circuit {
        let lib = GateLibrary::standard();
        let mut ret = Circuit::new();
        let a = ret.add_input("a");
        let y = ret.netlist.create_net("y");
        let x = ret.netlist.create_net("x");
        let g0 = ret
            .netlist
            .instantiate(
                lib.get("AND2").expect("And gate in the standard library"),
                "and",
                &[("A", a), ("B", y)],
                &[("Y", x)],
            )
            .expect("Generated connections are valid");
        let g1 = ret
            .netlist
            .instantiate(
                lib.get("INV").expect("Inverter in the standard library"),
                "inv",
                &[("A", x)],
                &[("Y", y)],
            )
            .expect("Generated connections are valid");
        ret.logic = vec![g0, g1];
        ret.outputs = vec![x, y];
        ret
    }

    /// A net `y` driven by two buffers, read by an inverter driving `z`
    pub fn multi_driven() -> Circuit {
        let lib = GateLibrary::standard();
        let buf = lib.get("BUF").expect("Buffer in the standard library");
        let mut ret = Circuit::new();
        let a = ret.add_input("a");
        let b = ret.add_input("b");
        let y = ret.netlist.create_net("y");
        for (i, src) in [a, b].into_iter().enumerate() {
            let g = ret
                .netlist
                .instantiate(buf, &format!("buf{i}"), &[("A", src)], &[("Y", y)])
                .expect("Generated connections are valid");
            ret.logic.push(g);
        }
        let z = ret.add_cell(&lib, "INV", &[y], true);
        ret.outputs = vec![y, z];
        ret
    }

    /// A chain of inverters, for deep logic
    pub fn inverter_chain(len: usize) -> Circuit {
        let lib = GateLibrary::standard();
        let mut ret = Circuit::new();
        let mut x = ret.add_input("a");
        for _ in 0..len {
            x = ret.add_cell(&lib, "INV", &[x], true);
        }
        ret.outputs.push(x);
        ret
    }

    /// A chain of and gates, each adding a new input to the previous output
    pub fn and_chain(len: usize) -> Circuit {
        let lib = GateLibrary::standard();
        let mut ret = Circuit::new();
        let mut x = ret.add_input("a_0");
        for i in 1..=len {
            let y = ret.add_input(&format!("a_{i}"));
            x = ret.add_cell(&lib, "AND2", &[x, y], true);
            ret.outputs.push(x);
        }
        ret
    }
}
