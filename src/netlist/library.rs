use std::sync::Arc;

use fxhash::FxHashMap;
use itertools::Itertools;

use crate::expr::Expr;
use crate::netlist::gate_type::{GateProperties, GateProperty, GateType, PinDirection};

/// A collection of gate types, looked up by name
#[derive(Debug, Clone, Default)]
pub struct GateLibrary {
    types: FxHashMap<String, Arc<GateType>>,
}

fn parse_cell(function: &str) -> Expr {
    Expr::parse(function).expect("Standard cell functions are well-formed")
}

/// A single-output combinational cell
fn comb(name: &str, inputs: &[&str], function: &str, extra: &[GateProperty]) -> GateType {
    let mut props = GateProperties::of(extra);
    props.insert(GateProperty::Combinational);
    GateType::new(name, props)
        .with_pins(inputs, PinDirection::Input)
        .with_pin("Y", PinDirection::Output)
        .with_function("Y", parse_cell(function))
}

impl GateLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a gate type, replacing any type with the same name
    pub fn add(&mut self, gate_type: GateType) -> Arc<GateType> {
        let t = Arc::new(gate_type);
        self.types.insert(t.name().to_string(), t.clone());
        t
    }

    /// Get a gate type by name
    pub fn get(&self, name: &str) -> Option<&Arc<GateType>> {
        self.types.get(name)
    }

    /// Names of all gate types, sorted
    pub fn names(&self) -> Vec<&str> {
        self.types.keys().map(|s| s.as_str()).sorted().collect()
    }

    /// A small library of standard cells
    ///
    /// Single-output cells use `Y` as output pin. `FA` has outputs `S` and `CO` and an internal
    /// propagate pin `P`; `DFF` has inputs `D`, `CLK`, `RST` and output `Q`; `LUT4` has inputs
    /// `I0` to `I3` and output `O`.
    pub fn standard() -> GateLibrary {
        use GateProperty::*;
        let mut lib = GateLibrary::new();
        lib.add(comb("BUF", &["A"], "A", &[Buffer]));
        lib.add(comb("INV", &["A"], "!A", &[Inverter]));
        lib.add(comb("AND2", &["A", "B"], "A & B", &[]));
        lib.add(comb("AND3", &["A", "B", "C"], "A & B & C", &[]));
        lib.add(comb("OR2", &["A", "B"], "A | B", &[]));
        lib.add(comb("NAND2", &["A", "B"], "!(A & B)", &[]));
        lib.add(comb("NOR2", &["A", "B"], "!(A | B)", &[]));
        lib.add(comb("XOR2", &["A", "B"], "A ^ B", &[]));
        lib.add(comb("XNOR2", &["A", "B"], "!(A ^ B)", &[]));
        lib.add(comb("XOR3", &["A", "B", "C"], "A ^ B ^ C", &[]));
        lib.add(comb(
            "MAJ3",
            &["A", "B", "C"],
            "(A & B) | (A & C) | (B & C)",
            &[],
        ));
        lib.add(comb("MUX2", &["A", "B", "S"], "(!S & A) | (S & B)", &[Mux]));
        lib.add(comb("GND", &[], "0", &[Ground]));
        lib.add(comb("VCC", &[], "1", &[Power]));
        lib.add(
            GateType::new("FA", GateProperties::of(&[Combinational]))
                .with_pins(&["A", "B", "CI"], PinDirection::Input)
                .with_pin("P", PinDirection::Internal)
                .with_pins(&["S", "CO"], PinDirection::Output)
                .with_function("P", parse_cell("A ^ B"))
                .with_function("S", parse_cell("P ^ CI"))
                .with_function("CO", parse_cell("(A & B) | (P & CI)")),
        );
        lib.add(
            GateType::new("DFF", GateProperties::of(&[Sequential]))
                .with_pins(&["D", "CLK", "RST"], PinDirection::Input)
                .with_pin("Q", PinDirection::Output),
        );
        lib.add(
            GateType::new("LUT4", GateProperties::of(&[Combinational, Lut]))
                .with_pins(&["I0", "I1", "I2", "I3"], PinDirection::Input)
                .with_pin("O", PinDirection::Output),
        );
        lib
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard() {
        let lib = GateLibrary::standard();
        assert_eq!(lib.names().len(), 17);
        for name in lib.names() {
            let t = lib.get(name).unwrap();
            // Every declared function only uses pins of its type
            for (pin, _) in t.pins() {
                if let Some(f) = t.function(pin) {
                    for v in f.free_variables() {
                        assert!(t.pin_direction(&v).is_some(), "{name}: unknown pin {v}");
                    }
                }
            }
        }
        let fa = lib.get("FA").unwrap();
        assert_eq!(fa.pin_direction("P"), Some(PinDirection::Internal));
        assert!(lib.get("DFF").unwrap().has_property(GateProperty::Sequential));
        assert!(lib.get("GND").unwrap().has_property(GateProperty::Ground));
        assert!(lib.get("VCC").unwrap().has_property(GateProperty::Power));
        assert!(lib.get("NAND4").is_none());
    }

    #[test]
    fn test_cell_functions() {
        let lib = GateLibrary::standard();
        let mux = lib.get("MUX2").unwrap().function("Y").unwrap();
        for i in 0..8u64 {
            let (a, b, s) = (i & 1, (i >> 1) & 1, (i >> 2) & 1);
            let asg = [("A", a), ("B", b), ("S", s)]
                .iter()
                .map(|(n, v)| (n.to_string(), *v))
                .collect();
            assert_eq!(mux.evaluate(&asg).unwrap(), if s == 1 { b } else { a });
        }
        let maj = lib.get("MAJ3").unwrap().function("Y").unwrap();
        for i in 0..8u64 {
            let asg = ["A", "B", "C"]
                .iter()
                .enumerate()
                .map(|(k, n)| (n.to_string(), (i >> k) & 1))
                .collect();
            assert_eq!(maj.evaluate(&asg).unwrap(), (i.count_ones() >= 2) as u64);
        }
    }
}
