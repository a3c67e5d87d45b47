//! Cycle-accurate event-driven execution of a gate DAG on the mesh.

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tessera_ir::{DepDag, Gate};

use crate::error::{BraidError, BraidResult};
use crate::event::{Event, Phase, gate_latency};
use crate::expand::{expand_gate, reroute_yx};
use crate::mesh::Mesh;

/// Tunables for the braid scheduler.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Surface-code distance; parameterises the event timers.
    pub code_distance: u32,
    /// Failed attempts before a cnot3/cnot5 event rotates its DOR segment.
    pub yx_threshold: u32,
    /// Failed attempts before the whole gate is dropped and reinjected.
    pub drop_threshold: u32,
    /// Cycles between stuck checks; an unchanged dependency-edge count
    /// across one full window aborts the run.
    pub progress_window: u64,
}

impl SchedulerConfig {
    /// Default thresholds for a given code distance.
    pub fn new(code_distance: u32) -> Self {
        Self {
            code_distance,
            yx_threshold: 4,
            drop_threshold: 8,
            progress_window: 1_000_000,
        }
    }
}

/// Results of simulating one leaf module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleStats {
    /// Module name.
    pub module: String,
    /// Logical qubit count.
    pub qubits: u64,
    /// Cycles if every gate ran back to back.
    pub serial_cycles: u64,
    /// Unbounded-width critical-path cycles.
    pub critical_cycles: u64,
    /// Simulated cycles.
    pub cycles: u64,
    /// Every successful event, in completion order.
    pub success_events: Vec<(u32, Phase)>,
    /// Conflicted attempts, counting retries.
    pub total_conflicts: u64,
    /// Distinct (gate, phase) pairs that ever conflicted.
    pub unique_conflicts: u64,
    /// Drop escalations, counting re-drops.
    pub total_dropped: u64,
    /// Distinct gates ever dropped.
    pub unique_dropped: u64,
    /// Histogram: attempts-at-success → event count.
    pub attempts_hist: BTreeMap<u32, u64>,
}

/// Event-driven braid scheduler for one leaf module.
pub struct BraidScheduler {
    cfg: SchedulerConfig,
    mesh: Mesh,
    dag: DepDag,
    gates: FxHashMap<u32, Gate>,
    event_queues: BTreeMap<u32, VecDeque<Event>>,
    ready_gates: Vec<u32>,
    ready_events: Vec<Event>,
    clk: u64,
}

impl BraidScheduler {
    /// Simulate one leaf module.
    ///
    /// Returns `None` when the module's lattice degenerates to a single
    /// cell; a lone data qubit has no routing surface to contend for.
    pub fn run(
        module: &str,
        gates: &[Gate],
        q_count: u64,
        cfg: SchedulerConfig,
    ) -> BraidResult<Option<ModuleStats>> {
        let (rows, cols) = Mesh::grid_for(q_count.max(1));
        if rows == 1 && cols == 1 {
            return Ok(None);
        }
        let capacity = u64::from(rows) * u64::from(cols);
        for g in gates {
            for &q in &g.qubits {
                if u64::from(q) >= capacity {
                    return Err(BraidError::QubitOutOfRange {
                        seq: g.seq,
                        qubit: q,
                        qubits: capacity,
                    });
                }
            }
        }
        tracing::debug!(module, rows, cols, gates = gates.len(), "building mesh");

        let d = cfg.code_distance;
        let dag = DepDag::build(gates.iter().map(|g| (g.seq, g.qubits.iter().copied())));
        let serial_cycles = gates.iter().map(|g| gate_latency(g.kind, d)).sum();
        let gate_map: FxHashMap<u32, Gate> = gates.iter().map(|g| (g.seq, g.clone())).collect();
        let critical_cycles = dag.critical_path(|seq| gate_latency(gate_map[&seq].kind, d));

        let mut sched = Self {
            cfg,
            mesh: Mesh::new(rows, cols),
            ready_gates: dag.ready_seqs(),
            dag,
            gates: gate_map,
            event_queues: BTreeMap::new(),
            ready_events: Vec::new(),
            clk: 0,
        };
        let mut stats = ModuleStats {
            module: module.to_string(),
            qubits: q_count,
            serial_cycles,
            critical_cycles,
            cycles: 0,
            success_events: Vec::new(),
            total_conflicts: 0,
            unique_conflicts: 0,
            total_dropped: 0,
            unique_dropped: 0,
            attempts_hist: BTreeMap::new(),
        };
        sched.simulate(module, &mut stats)?;
        stats.cycles = sched.clk;
        Ok(Some(stats))
    }

    fn simulate(&mut self, module: &str, stats: &mut ModuleStats) -> BraidResult<()> {
        let mut unique_conflicts: FxHashSet<(u32, Phase)> = FxHashSet::default();
        let mut unique_dropped: FxHashSet<u32> = FxHashSet::default();
        let mut edges_at_last_check = usize::MAX;

        while !self.event_queues.is_empty()
            || !self.ready_events.is_empty()
            || self.dag.edge_count() > 0
            || !self.ready_gates.is_empty()
        {
            if self.clk % self.cfg.progress_window == 0 {
                let edges = self.dag.edge_count();
                if edges != 0 && edges == edges_at_last_check {
                    return Err(BraidError::Stuck {
                        module: module.to_string(),
                        edges,
                        window: self.cfg.progress_window,
                    });
                }
                edges_at_last_check = edges;
                if self.clk > 0 {
                    tracing::info!(module, clk = self.clk, edges, "still scheduling");
                }
            }

            // Expand newly ready gates into their event pipelines.
            for seq in std::mem::take(&mut self.ready_gates) {
                let gate = &self.gates[&seq];
                let events = expand_gate(&self.mesh, gate);
                if events.is_empty() {
                    // Non-routed gate: retires instantly, enabling children.
                    self.ready_gates.extend(self.dag.complete(seq));
                    continue;
                }
                self.event_queues.insert(seq, events);
            }

            self.tick();
            self.attempt_ready_events(stats, &mut unique_conflicts, &mut unique_dropped);
        }

        stats.unique_conflicts = unique_conflicts.len() as u64;
        stats.unique_dropped = unique_dropped.len() as u64;
        Ok(())
    }

    /// Advance the clock: decrement the head timer of every queue whose
    /// predecessor has finished, promoting lapsed events to the ready list.
    fn tick(&mut self) {
        self.clk += 1;
        let mut lapsed: Vec<u32> = Vec::new();
        for (&seq, queue) in &mut self.event_queues {
            let Some(head) = queue.front_mut() else {
                continue; // last event still in flight in ready_events
            };
            if head.timer < 0 {
                continue;
            }
            if head.timer != 0 {
                head.timer -= 1;
            }
            if head.timer == 0 {
                lapsed.push(seq);
            }
        }
        for seq in lapsed {
            let queue = self.event_queues.get_mut(&seq).expect("queue exists");
            let event = queue.pop_front().expect("lapsed head exists");
            self.ready_events.push(event);
        }
    }

    /// Attempt every ready event in insertion order, escalating conflicts.
    /// At most one DOR rotation and one drop fire per cycle.
    fn attempt_ready_events(
        &mut self,
        stats: &mut ModuleStats,
        unique_conflicts: &mut FxHashSet<(u32, Phase)>,
        unique_dropped: &mut FxHashSet<u32>,
    ) {
        let mut yx_fired = false;
        let mut drop_fired = false;
        let mut i = 0;
        while i < self.ready_events.len() {
            if self.try_event(i) {
                let event = self.ready_events.remove(i);
                *stats.attempts_hist.entry(event.attempts).or_insert(0) += 1;
                stats.success_events.push((event.gate_seq, event.phase));
                let seq = event.gate_seq;
                let queue = self
                    .event_queues
                    .get_mut(&seq)
                    .expect("owning gate has a queue");
                if queue.is_empty() {
                    self.event_queues.remove(&seq);
                    self.ready_gates.extend(self.dag.complete(seq));
                } else {
                    let head = queue.front_mut().expect("non-empty queue");
                    head.timer = head.phase.timer(self.cfg.code_distance);
                }
                continue;
            }

            let event = &mut self.ready_events[i];
            event.attempts += 1;
            let seq = event.gate_seq;

            if event.attempts > self.cfg.yx_threshold
                && !yx_fired
                && matches!(event.phase, Phase::Cnot3 | Phase::Cnot5)
            {
                let gate = &self.gates[&seq];
                let (src, dst) = (gate.qubits[0], gate.qubits[1]);
                // The paired close event sits at the head of the gate's queue.
                let queue = self.event_queues.get_mut(&seq).expect("gate has a queue");
                let pair = queue.front_mut().expect("paired close event queued");
                let event = &mut self.ready_events[i];
                reroute_yx(&self.mesh, src, dst, event, pair);
                yx_fired = true;
            }

            let event = &self.ready_events[i];
            if event.attempts > self.cfg.drop_threshold && !drop_fired {
                tracing::debug!(gate = seq, clk = self.clk, "dropping gate");
                stats.total_dropped += 1;
                unique_dropped.insert(seq);
                // Cancel the gate entire: reservations, queue, and the
                // partial successes of this instance.
                self.mesh.purge_owner(seq);
                self.event_queues.remove(&seq);
                stats.success_events.retain(|&(g, _)| g != seq);
                self.ready_events.remove(i);
                self.ready_gates.push(seq);
                drop_fired = true;
                continue;
            }

            let event = &self.ready_events[i];
            stats.total_conflicts += 1;
            unique_conflicts.insert((event.gate_seq, event.phase));
            i += 1;
        }
    }

    /// Try to apply one event to the mesh.
    ///
    /// An open succeeds iff every cell is free; a close succeeds iff no
    /// cell is held by another gate.
    fn try_event(&mut self, idx: usize) -> bool {
        let event = &self.ready_events[idx];
        let seq = event.gate_seq;
        let blocked = |owner: u32| owner != 0 && (event.open || owner != seq);
        if event.braid.nodes.iter().any(|&n| blocked(self.mesh.node_owner(n)))
            || event.braid.links.iter().any(|&l| blocked(self.mesh.link_owner(l)))
        {
            return false;
        }
        let owner = if event.open { seq } else { 0 };
        let (nodes, links) = (event.braid.nodes.clone(), event.braid.links.clone());
        for n in nodes {
            self.mesh.set_node_owner(n, owner);
        }
        for l in links {
            self.mesh.set_link_owner(l, owner);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_ir::GateKind;

    fn run(gates: Vec<Gate>, q_count: u64, d: u32) -> ModuleStats {
        BraidScheduler::run("t", &gates, q_count, SchedulerConfig::new(d))
            .unwrap()
            .expect("non-degenerate lattice")
    }

    #[test]
    fn test_single_h_timing() {
        // One H: h1 lapses after 1 cycle, h2 after 8+d more.
        let d = 3;
        let stats = run(vec![Gate::one(1, GateKind::H, 0)], 2, d);
        assert_eq!(stats.cycles, 1 + 8 + u64::from(d));
        assert_eq!(stats.success_events.len(), 2);
        assert_eq!(stats.total_conflicts, 0);
    }

    #[test]
    fn test_adjacent_cnot_timing() {
        let d = 3;
        // Qubits 0 and 1 are row-adjacent on the 2x2 grid.
        let stats = run(vec![Gate::two(1, GateKind::Cnot, 0, 1)], 4, d);
        // Sum of the seven phase timers: five unit phases + two of d-1.
        assert_eq!(stats.cycles, 5 + 2 * (u64::from(d) - 1));
        assert_eq!(stats.success_events.len(), 7);
        assert_eq!(stats.total_conflicts, 0);
        assert_eq!(stats.total_dropped, 0);
    }

    #[test]
    fn test_mesh_freed_after_run() {
        let gates = vec![
            Gate::two(1, GateKind::Cnot, 0, 3),
            Gate::one(2, GateKind::H, 1),
            Gate::two(3, GateKind::Cnot, 1, 2),
        ];
        let stats = run(gates, 4, 5);
        assert_eq!(stats.success_events.len(), 7 + 2 + 7);
        // Every open was matched by a close.
        let opens = stats
            .success_events
            .iter()
            .filter(|(_, p)| matches!(p, Phase::Cnot1 | Phase::Cnot3 | Phase::Cnot5 | Phase::H1))
            .count();
        let closes = stats.success_events.len() - opens;
        assert!(closes >= opens);
    }

    #[test]
    fn test_dependent_gates_serialize() {
        let d = 3;
        let lat = 5 + 2 * (u64::from(d) - 1);
        // Two CNOTs sharing a qubit must run back to back.
        let gates = vec![
            Gate::two(1, GateKind::Cnot, 0, 1),
            Gate::two(2, GateKind::Cnot, 1, 0),
        ];
        let stats = run(gates, 2, d);
        assert_eq!(stats.cycles, 2 * lat);
        assert_eq!(stats.serial_cycles, 2 * lat);
        assert_eq!(stats.critical_cycles, 2 * lat);
    }

    #[test]
    fn test_degenerate_lattice_skipped() {
        let out = BraidScheduler::run(
            "t",
            &[Gate::one(1, GateKind::H, 0)],
            1,
            SchedulerConfig::new(3),
        )
        .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_competing_cnots_conflict_then_finish() {
        // Two non-adjacent CNOTs whose routes cross the centre of a 2x2 grid.
        let gates = vec![
            Gate::two(1, GateKind::Cnot, 0, 3),
            Gate::two(2, GateKind::Cnot, 1, 2),
        ];
        let stats = run(gates, 4, 5);
        assert_eq!(stats.success_events.len(), 14);
        assert!(stats.total_conflicts >= 1);
        assert!(stats.unique_conflicts >= 1);
        assert_eq!(stats.total_dropped, 0);
    }
}
