//! Timed open/close events over braids.

use serde::{Deserialize, Serialize};
use tessera_ir::GateKind;

use crate::braid::Braid;

/// Phase tag of an event within its gate's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Open the ancilla pair and their link.
    Cnot1,
    /// Close the ancilla link.
    Cnot2,
    /// Open route 1 (source S, DOR, destination S).
    Cnot3,
    /// Close route 1, retaining the first ancilla.
    Cnot4,
    /// Open route 2 (destination short-L, DOR back, source S).
    Cnot5,
    /// Close route 2.
    Cnot6,
    /// Close the remaining ancilla cells.
    Cnot7,
    /// Open the long-side links of the qubit.
    H1,
    /// Close them after the gate duration.
    H2,
}

impl Phase {
    /// Duration of this phase in cycles, for code distance `d`.
    #[inline]
    pub fn timer(&self, d: u32) -> i64 {
        match self {
            Phase::Cnot5 | Phase::Cnot7 => i64::from(d) - 1,
            Phase::H2 => 8 + i64::from(d),
            _ => 1,
        }
    }

    /// Name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Cnot1 => "cnot1",
            Phase::Cnot2 => "cnot2",
            Phase::Cnot3 => "cnot3",
            Phase::Cnot4 => "cnot4",
            Phase::Cnot5 => "cnot5",
            Phase::Cnot6 => "cnot6",
            Phase::Cnot7 => "cnot7",
            Phase::H1 => "h1",
            Phase::H2 => "h2",
        }
    }
}

/// Logical latency of a gate: the sum of its phase timers.
///
/// Gates outside the braid op set contribute nothing; the braid scheduler
/// only routes CNOT and H.
pub fn gate_latency(kind: GateKind, d: u32) -> u64 {
    match kind {
        GateKind::Cnot => [
            Phase::Cnot1,
            Phase::Cnot2,
            Phase::Cnot3,
            Phase::Cnot4,
            Phase::Cnot5,
            Phase::Cnot6,
            Phase::Cnot7,
        ]
        .iter()
        .map(|p| p.timer(d).max(0) as u64)
        .sum(),
        GateKind::H => [Phase::H1, Phase::H2]
            .iter()
            .map(|p| p.timer(d).max(0) as u64)
            .sum(),
        _ => 0,
    }
}

/// One timed mesh reservation or release.
///
/// Events for a gate form a FIFO queue; only the head event's timer ticks.
/// A timer of −1 means the event still waits on its predecessor, 0 means
/// ready to attempt, positive values count down.
#[derive(Debug, Clone)]
pub struct Event {
    /// The cells to reserve or release.
    pub braid: Braid,
    /// True to open (reserve), false to close (release).
    pub open: bool,
    /// Owning gate's sequence number.
    pub gate_seq: u32,
    /// Phase tag.
    pub phase: Phase,
    /// Countdown state.
    pub timer: i64,
    /// Failed attempts so far; drives the DOR/drop escalation.
    pub attempts: u32,
}

impl Event {
    /// Create an event.
    pub fn new(braid: Braid, open: bool, gate_seq: u32, phase: Phase, timer: i64) -> Self {
        Self {
            braid,
            open,
            gate_seq,
            phase,
            timer,
            attempts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_table() {
        let d = 5;
        assert_eq!(Phase::Cnot1.timer(d), 1);
        assert_eq!(Phase::Cnot4.timer(d), 1);
        assert_eq!(Phase::Cnot5.timer(d), 4);
        assert_eq!(Phase::Cnot7.timer(d), 4);
        assert_eq!(Phase::H1.timer(d), 1);
        assert_eq!(Phase::H2.timer(d), 13);
    }

    #[test]
    fn test_gate_latency_sums_timers() {
        // CNOT: five unit phases plus two (d-1) phases.
        assert_eq!(gate_latency(GateKind::Cnot, 5), 13);
        assert_eq!(gate_latency(GateKind::H, 5), 14);
        assert_eq!(gate_latency(GateKind::T, 5), 0);
        // d = 1 degenerates the long phases to zero.
        assert_eq!(gate_latency(GateKind::Cnot, 1), 5);
    }
}
