//! SIMD-k list scheduling for leaf basic blocks.

use rustc_hash::FxHashMap;
use tessera_ir::GateKind;

use crate::profile::{ModuleProfile, Rect};

/// One gate of a leaf block, with named operands.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafOp {
    /// The operation.
    pub kind: GateKind,
    /// Operand qubit names.
    pub args: Vec<String>,
}

/// One SIMD lane of one timestep: a gate type and how many instances of it
/// share the lane data-parallel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotBundle {
    /// Gate type held by the lane, or empty.
    pub kind: Option<GateKind>,
    /// Instances packed into the lane.
    pub count: u64,
}

/// Schedule priorities: indexes into the op list, highest priority first.
///
/// Priority is the unbounded critical-path depth from the block's output,
/// computed by walking the ops in reverse and chaining per-operand last-use
/// timesteps.
pub(crate) fn priority_order(args_of: &[&[String]]) -> Vec<usize> {
    let mut last: FxHashMap<&str, u64> = FxHashMap::default();
    let mut pri: Vec<(usize, u64)> = Vec::with_capacity(args_of.len());
    for idx in (0..args_of.len()).rev() {
        let depth = args_of[idx]
            .iter()
            .map(|a| last.get(a.as_str()).copied().unwrap_or(0))
            .max()
            .unwrap_or(0);
        for a in args_of[idx] {
            last.insert(a.as_str(), depth + 1);
        }
        pri.push((idx, depth));
    }
    pri.sort_by_key(|&(_, p)| p);
    pri.into_iter().rev().map(|(i, _)| i).collect()
}

#[derive(Default)]
struct TCounters {
    width: u64,
    tgates: u64,
    tgates_ub: u64,
    tgates_par: u64,
    tgates_par_ub: u64,
}

/// List-schedule a leaf block for every width `1..=k_max`, keeping the
/// Pareto front of resulting rectangles.
pub fn schedule_leaf(name: &str, ops: &[LeafOp], k_max: u64, d_constraint: u64) -> ModuleProfile {
    let args: Vec<&[String]> = ops.iter().map(|o| o.args.as_slice()).collect();
    let order = priority_order(&args);

    let mut profile = ModuleProfile::new(name, true);
    for k in 1..=k_max.max(1) {
        let rect = schedule_at_width(ops, &order, k, d_constraint);
        if !profile.push_pareto(rect) {
            break;
        }
    }
    tracing::debug!(
        module = name,
        fronts = profile.rects.len(),
        "leaf schedule complete"
    );
    profile
}

fn schedule_at_width(ops: &[LeafOp], order: &[usize], k: u64, d: u64) -> Rect {
    let mut steps: Vec<Vec<SlotBundle>> = Vec::new();
    let mut last: FxHashMap<&str, u64> = FxHashMap::default();
    let mut barrier_floor = 0u64;
    let mut c = TCounters::default();
    let mut first_meas = true;

    for &idx in order {
        let op = &ops[idx];
        let start = if first_meas && op.kind.is_measure() {
            // The first measurement after the quiescent phase acts as a
            // barrier: every qubit's history is synchronised to it.
            last.values().copied().max().unwrap_or(0).max(barrier_floor)
        } else {
            op.args
                .iter()
                .map(|a| last.get(a.as_str()).copied().unwrap_or(barrier_floor))
                .max()
                .unwrap_or(barrier_floor)
        };

        let ts = place(&mut steps, start, op.kind, k, d, &mut c);

        if first_meas && op.kind.is_measure() {
            for v in last.values_mut() {
                *v = ts + 1;
            }
            barrier_floor = ts + 1;
            first_meas = false;
        }
        for a in &op.args {
            last.insert(a.as_str(), ts + 1);
        }
    }

    Rect {
        width: c.width,
        length: steps.len() as u64,
        tgates: c.tgates,
        tgates_ub: c.tgates_ub,
        tgates_par: c.tgates_par,
        tgates_par_ub: c.tgates_par_ub,
        ops: ops.len() as u64,
        moves: 0,
        mts: 0,
    }
}

/// Place one gate at the earliest timestep ≥ `start` with a matching or
/// empty lane, creating a new timestep when none fits. Returns the chosen
/// timestep.
fn place(
    steps: &mut Vec<Vec<SlotBundle>>,
    start: u64,
    kind: GateKind,
    k: u64,
    d: u64,
    c: &mut TCounters,
) -> u64 {
    let lane_has_room = |count: u64| {
        // CNOTs occupy both halves of a lane pair.
        if kind == GateKind::Cnot {
            2 * count < d
        } else {
            count < d
        }
    };

    for i in start as usize..steps.len() {
        for j in 0..steps[i].len() {
            let slot = steps[i][j];
            match slot.kind {
                Some(g) if g == kind && lane_has_room(slot.count) => {
                    steps[i][j].count += 1;
                    if kind.is_t() && steps[i][j].count > c.tgates_par {
                        c.tgates_par = steps[i][j].count;
                        c.tgates_par_ub = steps[i][j].count;
                    }
                    return i as u64;
                }
                None => {
                    steps[i][j] = SlotBundle {
                        kind: Some(kind),
                        count: 1,
                    };
                    if j as u64 + 1 > c.width {
                        c.width = j as u64 + 1;
                    }
                    if kind.is_t() {
                        let step_had_t = steps[i]
                            .iter()
                            .enumerate()
                            .any(|(jj, s)| jj != j && s.kind.is_some_and(|g| g.is_t()));
                        if !step_had_t {
                            c.tgates += 1;
                            c.tgates_ub += 1;
                            if c.tgates_par == 0 {
                                c.tgates_par = 1;
                                c.tgates_par_ub = 1;
                            }
                        }
                    }
                    return i as u64;
                }
                _ => {}
            }
        }
    }

    // No lane fits: open a new timestep.
    let mut step = vec![SlotBundle::default(); k as usize];
    step[0] = SlotBundle {
        kind: Some(kind),
        count: 1,
    };
    steps.push(step);
    if c.width == 0 {
        c.width = 1;
    }
    if kind.is_t() {
        c.tgates += 1;
        c.tgates_ub += 1;
        if c.tgates_par == 0 {
            c.tgates_par = 1;
            c.tgates_par_ub = 1;
        }
    }
    steps.len() as u64 - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(kind: GateKind, args: &[&str]) -> LeafOp {
        LeafOp {
            kind,
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_same_type_gates_share_a_lane() {
        // Ten independent Hadamards coalesce data-parallel into one step.
        let ops: Vec<LeafOp> = (0..10)
            .map(|i| op(GateKind::H, &[&format!("q{i}")]))
            .collect();
        let profile = schedule_leaf("m", &ops, 4, 1024);
        let r = &profile.rects[0];
        assert_eq!(r.length, 1);
        assert_eq!(r.width, 1);
        assert_eq!(r.ops, 10);
    }

    #[test]
    fn test_d_constraint_splits_lanes() {
        let ops: Vec<LeafOp> = (0..10)
            .map(|i| op(GateKind::H, &[&format!("q{i}")]))
            .collect();
        // d=4: at most four H per lane; k=1 forces extra timesteps.
        let profile = schedule_leaf("m", &ops, 1, 4);
        assert_eq!(profile.rects[0].length, 3);
    }

    #[test]
    fn test_cnot_half_density() {
        let ops: Vec<LeafOp> = (0..4)
            .map(|i| op(GateKind::Cnot, &[&format!("a{i}"), &format!("b{i}")]))
            .collect();
        // d=4: a CNOT lane holds two CNOTs (2 * count < 4).
        let profile = schedule_leaf("m", &ops, 1, 4);
        assert_eq!(profile.rects[0].length, 2);
    }

    #[test]
    fn test_dependent_chain_serializes() {
        let ops = vec![
            op(GateKind::H, &["q0"]),
            op(GateKind::T, &["q0"]),
            op(GateKind::H, &["q0"]),
        ];
        let profile = schedule_leaf("m", &ops, 4, 1024);
        assert_eq!(profile.rects[0].length, 3);
        assert_eq!(profile.rects[0].tgates, 1);
        assert_eq!(profile.rects[0].tgates_par, 1);
    }

    #[test]
    fn test_pareto_front_improves_with_width() {
        // Two independent chains of distinct gate types.
        let ops = vec![
            op(GateKind::H, &["a"]),
            op(GateKind::S, &["a"]),
            op(GateKind::T, &["b"]),
            op(GateKind::X, &["b"]),
        ];
        let profile = schedule_leaf("m", &ops, 4, 1024);
        assert!(profile.rects.len() >= 2);
        assert!(profile.is_pareto());
        assert_eq!(profile.rects[0].width, 1);
        assert_eq!(profile.rects[0].length, 4);
        assert_eq!(profile.rects[1].length, 2);
    }

    #[test]
    fn test_first_meas_barrier() {
        // The measurement waits for every qubit, not just its own operand.
        let ops = vec![
            op(GateKind::H, &["a"]),
            op(GateKind::H, &["a"]),
            op(GateKind::H, &["a"]),
            op(GateKind::MeasZ, &["b"]),
        ];
        let profile = schedule_leaf("m", &ops, 4, 1024);
        // Three serialized H steps, then the barrier measurement.
        assert_eq!(profile.rects[0].length, 4);
    }

    #[test]
    fn test_t_parallelism_counters() {
        let ops = vec![
            op(GateKind::T, &["a"]),
            op(GateKind::T, &["b"]),
            op(GateKind::T, &["c"]),
        ];
        let profile = schedule_leaf("m", &ops, 2, 1024);
        let r = &profile.rects[0];
        assert_eq!(r.tgates, 1);
        assert_eq!(r.tgates_par, 3);
    }
}
