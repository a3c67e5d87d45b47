//! Per-cycle usage recording.

use serde::Serialize;

/// Time series recorded every simulated cycle.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Metrics {
    /// Live qubits.
    pub qubits_per_cycle: Vec<u64>,
    /// Live zero ancillas.
    pub zeros_per_cycle: Vec<u64>,
    /// Live EPR halves.
    pub eprs_per_cycle: Vec<u64>,
    /// Live magic states.
    pub magics_per_cycle: Vec<u64>,
    /// Live qubits per tile.
    pub storage_per_cycle: Vec<Vec<u64>>,
}

impl Metrics {
    /// Record one cycle.
    pub fn push_cycle(&mut self, live: u64, zeros: u64, eprs: u64, magics: u64, storage: Vec<u64>) {
        self.qubits_per_cycle.push(live);
        self.zeros_per_cycle.push(zeros);
        self.eprs_per_cycle.push(eprs);
        self.magics_per_cycle.push(magics);
        self.storage_per_cycle.push(storage);
    }

    /// Peak live qubit count over the whole run.
    pub fn peak_live(&self) -> u64 {
        self.qubits_per_cycle.iter().copied().max().unwrap_or(0)
    }

    /// Total live ancillas per cycle (zeros + EPRs + magics).
    pub fn ancilla_usage(&self) -> Vec<u64> {
        self.zeros_per_cycle
            .iter()
            .zip(&self.eprs_per_cycle)
            .zip(&self.magics_per_cycle)
            .map(|((z, e), m)| z + e + m)
            .collect()
    }

    /// Peak occupancy per tile.
    pub fn peak_storage(&self, tiles: usize) -> Vec<u64> {
        let mut peak = vec![0u64; tiles];
        for cycle in &self.storage_per_cycle {
            for (p, &v) in peak.iter_mut().zip(cycle) {
                if v > *p {
                    *p = v;
                }
            }
        }
        peak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peaks() {
        let mut m = Metrics::default();
        m.push_cycle(3, 1, 1, 0, vec![2, 1]);
        m.push_cycle(5, 2, 1, 1, vec![1, 4]);
        m.push_cycle(2, 0, 1, 0, vec![0, 2]);
        assert_eq!(m.peak_live(), 5);
        assert_eq!(m.ancilla_usage(), vec![2, 4, 1]);
        assert_eq!(m.peak_storage(2), vec![2, 4]);
    }
}
