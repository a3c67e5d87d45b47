//! Property tests for the braid scheduler.

use proptest::prelude::*;
use tessera_braid::{BraidScheduler, SchedulerConfig};
use tessera_ir::{Gate, GateKind};

/// Random gate lists over a 3x3 lattice.
fn arb_gates() -> impl Strategy<Value = Vec<Gate>> {
    proptest::collection::vec((0u32..9, 0u32..9, any::<bool>()), 1..10).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (a, b, is_h))| {
                let seq = i as u32 + 1;
                if is_h || a == b {
                    Gate::one(seq, GateKind::H, a)
                } else {
                    Gate::two(seq, GateKind::Cnot, a, b)
                }
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every schedule terminates with exactly one success per event phase
    /// per gate, regardless of contention, reroutes, or drops.
    #[test]
    fn prop_every_gate_completes_each_phase_once(gates in arb_gates()) {
        let mut cfg = SchedulerConfig::new(3);
        cfg.yx_threshold = 2;
        cfg.drop_threshold = 5;
        let stats = BraidScheduler::run("prop", &gates, 9, cfg)
            .expect("scheduler terminates")
            .expect("3x3 lattice is not degenerate");

        let expected: usize = gates
            .iter()
            .map(|g| if g.kind == GateKind::Cnot { 7 } else { 2 })
            .sum();
        prop_assert_eq!(stats.success_events.len(), expected);
        for g in &gates {
            let per_gate = stats
                .success_events
                .iter()
                .filter(|&&(seq, _)| seq == g.seq)
                .count();
            prop_assert_eq!(per_gate, if g.kind == GateKind::Cnot { 7 } else { 2 });
        }
        // The simulated schedule can never beat the critical path.
        prop_assert!(stats.cycles >= stats.critical_cycles);
        prop_assert!(stats.serial_cycles >= stats.critical_cycles);
    }
}
