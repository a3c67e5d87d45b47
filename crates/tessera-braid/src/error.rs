//! Error types for the braid scheduler.

use thiserror::Error;

/// Errors that can occur in braid scheduling.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BraidError {
    /// Physical error rate is at or above the code threshold.
    #[error("physical error rate 10^-{p} is above the code threshold 10^-{threshold}")]
    AboveThreshold {
        /// Device error exponent.
        p: i32,
        /// Code threshold exponent.
        threshold: i32,
    },

    /// Computed code distance cannot support surface-code operation.
    #[error("code distance {0} too small for surface code operation")]
    DistanceTooSmall(i32),

    /// No finite code distance reaches the error budget.
    #[error("no code distance reaches the error budget at error rate 10^-{p}")]
    Infeasible {
        /// Device error exponent.
        p: i32,
    },

    /// No dependency edge was removed across a full progress window.
    #[error("scheduler stuck in module '{module}': {edges} dependency edges unchanged after {window} cycles")]
    Stuck {
        /// Module being simulated.
        module: String,
        /// Remaining edge count.
        edges: usize,
        /// Progress-check window in cycles.
        window: u64,
    },

    /// Gate references a qubit outside the module's lattice.
    #[error("gate {seq} references qubit {qubit} outside lattice of {qubits} qubits")]
    QubitOutOfRange {
        /// Offending gate.
        seq: u32,
        /// Offending operand.
        qubit: u32,
        /// Module qubit count.
        qubits: u64,
    },
}

/// Result type for braid operations.
pub type BraidResult<T> = Result<T, BraidError>;
