//! Tile lattice layout, ancilla factories, and concatenation arithmetic.

use serde::Serialize;
use tessera_ir::{GateKind, SubLoc};

use crate::error::{SimError, SimResult};

/// Concatenated-code threshold exponent.
pub const P_TH: i32 = 4;

/// Total logical error budget for the program.
pub const EPSILON: f64 = 0.5;

/// Derive the concatenation level from the device error exponent and the
/// total logical gate count.
///
/// Returns the target logical error rate and the level. Level 0 means the
/// raw circuit already meets the budget.
pub fn concatenation_level(p: i32, total_logical_gates: u64) -> SimResult<(f64, u32)> {
    if p < P_TH {
        return Err(SimError::AboveThreshold { p, threshold: P_TH });
    }
    let l_error_rate = EPSILON / total_logical_gates.max(1) as f64;
    if l_error_rate > 10f64.powi(-p) {
        // The raw circuit already meets the budget.
        return Ok((l_error_rate, 0));
    }
    if p == P_TH {
        // Exactly at threshold, recursion buys nothing.
        return Err(SimError::Infeasible { p });
    }
    let c = 1.0 / 10f64.powi(-P_TH);
    let two_to_l = (c * l_error_rate).ln() / (c * 10f64.powi(-p)).ln();
    let level = two_to_l.log2().ceil();
    if !level.is_finite() || level > 22.0 {
        return Err(SimError::Infeasible { p });
    }
    Ok((l_error_rate, level.max(0.0) as u32))
}

/// Per-output latency and footprint of the ancilla factories at one
/// concatenation level.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FactoryModel {
    /// Cycles to produce one |0⟩.
    pub zero_delay: u64,
    /// Cycles to produce one Bell pair.
    pub epr_delay: u64,
    /// Cycles to produce one magic state.
    pub magic_delay: u64,
    /// Physical qubits per |0⟩.
    pub zero_size: u64,
    /// Physical qubits per Bell pair.
    pub epr_size: u64,
    /// Physical qubits per magic state.
    pub magic_size: u64,
}

impl FactoryModel {
    /// Build the factory model for concatenation level `l`.
    pub fn new(level: u32) -> Self {
        let d = |k: GateKind| k.op_delay();
        let l = u64::from(level);
        let magic_cnots: u64 = (0..level).map(|i| 7u64.pow(i) - 1).sum();

        let zero_delay = d(GateKind::PrepZ)
            + l * (3 * d(GateKind::H) + 9 * d(GateKind::Cnot) + d(GateKind::MeasZ));
        let epr_delay = d(GateKind::PrepZ) + (l + 1) * (d(GateKind::H) + d(GateKind::Cnot));
        let magic_delay = d(GateKind::PrepZ)
            + (l + 1)
                * (2 * d(GateKind::H) + 4 * d(GateKind::Cnot) + d(GateKind::T) + d(GateKind::MeasZ))
            + magic_cnots * d(GateKind::Cnot);

        let block = if level == 0 {
            1
        } else {
            8 * 7u64.pow(level - 1)
        };
        Self {
            zero_delay,
            epr_delay,
            magic_delay,
            zero_size: block,
            epr_size: if level == 0 { 2 } else { 2 * block },
            magic_size: if level == 0 { 2 } else { 2 * block },
        }
    }
}

/// The SIMD tile lattice: compute regions plus appended ancilla factories.
#[derive(Debug, Clone, Serialize)]
pub struct TileLayout {
    /// Total zones, factories included.
    pub simd_k: u32,
    /// Data-parallelism constraint carried from the schedule.
    pub simd_d: u32,
    /// Lattice rows (each tile spans a T row and a G row).
    pub rows: u32,
    /// Lattice columns.
    pub cols: u32,
    /// Zero-factory zones.
    pub zero_factories: Vec<u32>,
    /// EPR-factory zones.
    pub epr_factories: Vec<u32>,
    /// Magic-factory zones.
    pub magic_factories: Vec<u32>,
}

impl TileLayout {
    /// Lay out `compute_k` compute regions plus one factory of each kind.
    pub fn new(compute_k: u32, simd_d: u32) -> Self {
        Self::with_factories(compute_k, simd_d, 1, 1, 1)
    }

    /// Lay out the lattice with explicit factory counts. Factories are
    /// appended after the compute regions: zero, then EPR, then magic.
    pub fn with_factories(
        compute_k: u32,
        simd_d: u32,
        num_zero: u32,
        num_epr: u32,
        num_magic: u32,
    ) -> Self {
        let simd_k = compute_k + num_zero + num_epr + num_magic;
        let rows = (f64::from(2 * simd_k)).sqrt().ceil() as u32;
        let cols = (f64::from(2 * simd_k) / f64::from(rows)).ceil() as u32;

        let zero_factories = (0..num_zero).map(|i| compute_k + i + 1).collect();
        let epr_factories = (0..num_epr).map(|i| compute_k + num_zero + i + 1).collect();
        let magic_factories = (0..num_magic)
            .map(|i| compute_k + num_zero + num_epr + i + 1)
            .collect();
        Self {
            simd_k,
            simd_d,
            rows,
            cols,
            zero_factories,
            epr_factories,
            magic_factories,
        }
    }

    /// Check if a zone is a zero factory.
    pub fn is_zero_factory(&self, zone: u32) -> bool {
        self.zero_factories.contains(&zone)
    }

    /// Check if a zone is an EPR factory.
    pub fn is_epr_factory(&self, zone: u32) -> bool {
        self.epr_factories.contains(&zone)
    }

    /// Check if a zone is a magic factory.
    pub fn is_magic_factory(&self, zone: u32) -> bool {
        self.magic_factories.contains(&zone)
    }

    /// The zero factory serving the `n`-th injection.
    pub fn zero_factory_for(&self, n: u64) -> u32 {
        self.zero_factories[(n % self.zero_factories.len() as u64) as usize]
    }

    /// The EPR factory serving the `n`-th teleport.
    pub fn epr_factory_for(&self, n: u64) -> u32 {
        self.epr_factories[(n % self.epr_factories.len() as u64) as usize]
    }

    /// Manhattan routing distance between two tile endpoints.
    ///
    /// Each zone occupies a T/G row pair; odd and even columns alternate
    /// which row carries which sub-location, and the endpoint row shifts
    /// accordingly.
    pub fn route_distance(&self, src: u32, src_sub: SubLoc, dst: u32, dst_sub: SubLoc) -> u64 {
        let place = |zone: u32, sub: SubLoc| -> (i64, i64) {
            let mut row = 2 * i64::from((zone - 1) / self.cols) + 1;
            let col = i64::from((zone - 1) % self.cols) + 1;
            let tile_side = matches!(sub, SubLoc::Tile | SubLoc::TuTile);
            let global_side = matches!(sub, SubLoc::Global | SubLoc::TuGlobal);
            if (col % 2 == 0 && tile_side) || (col % 2 == 1 && global_side) {
                row += 1;
            }
            (row, col)
        };
        let (sr, sc) = place(src, src_sub);
        let (dr, dc) = place(dst, dst_sub);
        sr.abs_diff(dr) + sc.abs_diff(dc)
    }
}
