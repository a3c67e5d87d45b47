//! Surface-code distance and physical-area arithmetic.

use serde::Serialize;

use crate::error::{BraidError, BraidResult};

/// Surface-code threshold exponent: threshold error rate is `10^-P_TH`.
pub const P_TH: i32 = 2;

/// Total logical error budget for the program.
pub const EPSILON: f64 = 0.5;

/// Derived code parameters for one run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CodeParams {
    /// Device error exponent: physical error rate is `10^-p`.
    pub p: i32,
    /// Target per-gate logical error rate.
    pub l_error_rate: f64,
    /// Code distance.
    pub distance: u32,
}

impl CodeParams {
    /// Derive the code distance from the device error exponent and the
    /// total logical gate count (KQ).
    ///
    /// Fails when the device error rate is at or above the code threshold,
    /// or when no distance ≥ 1 meets the budget.
    pub fn derive(p: i32, total_logical_gates: u64) -> BraidResult<Self> {
        if p < P_TH {
            return Err(BraidError::AboveThreshold { p, threshold: P_TH });
        }
        let l_error_rate = EPSILON / total_logical_gates.max(1) as f64;
        let p_phys = 10f64.powi(-p);
        if l_error_rate > p_phys {
            // Very small circuit: the smallest mesh already meets the budget.
            return Ok(Self {
                p,
                l_error_rate,
                distance: 1,
            });
        }
        if p == P_TH {
            // Exactly at threshold, distance buys nothing.
            return Err(BraidError::Infeasible { p });
        }
        let p_th = 10f64.powi(-P_TH);
        let distance =
            2 * (((100.0 / 3.0) * l_error_rate).ln() / (p_phys / p_th).ln()).ceil() as i32 - 1;
        if distance < 1 {
            return Err(BraidError::DistanceTooSmall(distance));
        }
        Ok(Self {
            p,
            l_error_rate,
            distance: distance as u32,
        })
    }
}

/// Physical qubit count for a mesh of `max_q` logical tiles at distance `d`.
///
/// Tiles are double-hole plaquettes with routing channels between them; the
/// boundary channels contribute the square-root terms.
pub fn area_physical_qubits(d: u32, max_q: u64) -> u64 {
    let d = f64::from(d);
    let hole_side = 2.0 * (d / 4.0).ceil() + 1.0;
    let width_channel = hole_side;
    let hole_to_channel = 2.0 * (d / 2.0).ceil();
    let length_tile = 2.0 * hole_side + width_channel + 4.0 * hole_to_channel - 6.0;
    let width_tile = hole_side + 2.0 * hole_to_channel - 2.0;
    let area_tile_plus = (width_tile + width_channel) * (length_tile + width_channel);

    let q = max_q as f64;
    let total = q * area_tile_plus
        + q.sqrt() * (width_channel * (width_channel + length_tile))
        + q.sqrt() * (width_channel * (width_channel + width_tile))
        + width_channel * width_channel;
    total as u64
}
