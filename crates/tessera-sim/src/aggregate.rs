//! Call-graph traversal and KQ aggregation.

use rustc_hash::FxHashMap;
use tessera_ir::CgInst;

/// How many occurrences of each leaf the simulator actually walks; the
/// rest are extrapolated from the per-leaf average.
pub const LEAF_SIMULATION_MAX: usize = 3;

/// Depth-first pre-order traversal of the call graph from `root`,
/// yielding the leaf execution sequence. A name with no body is a leaf.
/// Back-edges (recursion) are skipped with a warning.
pub fn ordered_leaf_sequence(root: &str, bodies: &FxHashMap<String, Vec<CgInst>>) -> Vec<String> {
    let mut out = Vec::new();
    let mut path: Vec<String> = Vec::new();
    walk(root, bodies, &mut path, &mut out);
    out
}

fn walk(
    name: &str,
    bodies: &FxHashMap<String, Vec<CgInst>>,
    path: &mut Vec<String>,
    out: &mut Vec<String>,
) {
    let Some(body) = bodies.get(name) else {
        out.push(name.to_string());
        return;
    };
    if path.iter().any(|p| p == name) {
        tracing::warn!(module = name, "recursive call skipped in traversal");
        return;
    }
    path.push(name.to_string());
    for inst in body {
        walk(&inst.callee, bodies, path, out);
    }
    path.pop();
}

/// Cap the leaf sequence at [`LEAF_SIMULATION_MAX`] occurrences per leaf,
/// preserving execution order.
pub fn capped_leaf_sequence(all: &[String]) -> Vec<String> {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    let mut out = Vec::new();
    for name in all {
        let c = counts.entry(name.as_str()).or_insert(0);
        if *c < LEAF_SIMULATION_MAX {
            *c += 1;
            out.push(name.clone());
        }
    }
    out
}

/// Frequency-weighted total cycles: each leaf contributes the mean of its
/// simulated occurrences times its profile frequency.
pub fn weighted_total_cycles(
    leaf_cycles: &FxHashMap<String, Vec<u64>>,
    freqs: &FxHashMap<String, u64>,
) -> u64 {
    let mut total = 0u64;
    for (leaf, cycles) in leaf_cycles {
        if cycles.is_empty() {
            continue;
        }
        let avg = cycles.iter().sum::<u64>() / cycles.len() as u64;
        let freq = freqs.get(leaf).copied().unwrap_or(0);
        total += avg * freq;
    }
    total
}

/// Physical qubit count: peak live logical qubits times the level-`l`
/// concatenation blow-up.
pub fn physical_qubits(peak_live: u64, level: u32) -> u64 {
    peak_live * 7u64.pow(level)
}
