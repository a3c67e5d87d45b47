//! Placement-optimiser exchange format (`.tr` / `.opt.tr`).

use rustc_hash::FxHashMap;
use tessera_ir::{Gate, GateKind};

use crate::error::{TraceError, TraceResult};

/// Render per-module gate traces for the external placement optimiser.
pub fn write_tr(modules: &[(String, Vec<Gate>, u64)]) -> String {
    let mut out = String::new();
    for (name, gates, q_count) in modules {
        if gates.is_empty() {
            continue;
        }
        out.push_str(&format!("module: {name}\n"));
        out.push_str(&format!("num_nodes: {q_count}\n"));
        for g in gates {
            match g.qubits.as_slice() {
                [src] => out.push_str(&format!("ID: {} TYPE: {} SRC: {src}\n", g.seq, g.kind)),
                [src, dst] => out.push_str(&format!(
                    "ID: {} TYPE: {} SRC: {src} DST: {dst}\n",
                    g.seq, g.kind
                )),
                _ => {}
            }
        }
    }
    out
}

/// Parse the optimiser's rearranged trace back into per-module gate lists.
pub fn parse_tr(text: &str) -> TraceResult<FxHashMap<String, Vec<Gate>>> {
    let mut modules: FxHashMap<String, Vec<Gate>> = FxHashMap::default();
    let mut current: Option<String> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let lineno = lineno + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens[0] {
            "module:" => {
                let name = tokens
                    .get(1)
                    .ok_or_else(|| TraceError::malformed(lineno, "module line without a name"))?;
                modules.entry((*name).to_string()).or_default();
                current = Some((*name).to_string());
            }
            "num_nodes:" => {}
            "ID:" => {
                let module = current
                    .as_ref()
                    .ok_or_else(|| TraceError::malformed(lineno, "gate before any module"))?;
                if tokens.len() < 6 {
                    return Err(TraceError::malformed(lineno, "short gate line"));
                }
                let seq: u32 = tokens[1]
                    .parse()
                    .map_err(|_| TraceError::malformed(lineno, "bad gate id"))?;
                let kind = GateKind::parse(tokens[3])
                    .map_err(|source| TraceError::BadGate { line: lineno, source })?;
                let mut qubits = vec![
                    tokens[5]
                        .parse()
                        .map_err(|_| TraceError::malformed(lineno, "bad SRC"))?,
                ];
                if tokens.len() >= 8 {
                    qubits.push(
                        tokens[7]
                            .parse()
                            .map_err(|_| TraceError::malformed(lineno, "bad DST"))?,
                    );
                }
                modules
                    .get_mut(module)
                    .expect("module registered above")
                    .push(Gate { seq, kind, qubits });
            }
            _ => {}
        }
    }
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let modules = vec![(
            "leaf_a".to_string(),
            vec![
                Gate::two(1, GateKind::Cnot, 0, 3),
                Gate::one(2, GateKind::H, 1),
            ],
            4u64,
        )];
        let text = write_tr(&modules);
        assert!(text.contains("module: leaf_a"));
        assert!(text.contains("num_nodes: 4"));
        assert!(text.contains("ID: 1 TYPE: CNOT SRC: 0 DST: 3"));

        let parsed = parse_tr(&text).unwrap();
        assert_eq!(parsed["leaf_a"].len(), 2);
        assert_eq!(parsed["leaf_a"][0].qubits, vec![0, 3]);
        assert_eq!(parsed["leaf_a"][1].kind, GateKind::H);
    }

    #[test]
    fn test_gate_before_module_rejected() {
        assert!(matches!(
            parse_tr("ID: 1 TYPE: H SRC: 0\n"),
            Err(TraceError::Malformed { line: 1, .. })
        ));
    }
}
