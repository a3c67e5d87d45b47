//! Error types for the tile simulator.

use thiserror::Error;

/// Errors that can occur in expansion or simulation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// Concatenated-code parameters cannot reach the error budget.
    #[error("physical error rate 10^-{p} is above the concatenated-code threshold 10^-{threshold}")]
    AboveThreshold {
        /// Device error exponent.
        p: i32,
        /// Code threshold exponent.
        threshold: i32,
    },

    /// No finite concatenation depth reaches the error budget.
    #[error("no concatenation level reaches the error budget at error rate 10^-{p}")]
    Infeasible {
        /// Device error exponent.
        p: i32,
    },

    /// A qubit id was created twice.
    #[error("attempted to create an existing qubit '{0}'")]
    QubitExists(String),

    /// An instruction touched a qubit that does not exist.
    #[error("qubit '{id}' does not exist ({context})")]
    QubitMissing {
        /// The missing qubit id.
        id: String,
        /// What required it.
        context: &'static str,
    },

    /// A move was issued for a qubit that is not at the move's source.
    #[error("qubit '{0}' is not at the move's source location")]
    NotAtSource(String),

    /// An op became ready with an operand outside its zone.
    #[error("op operand '{0}' is not in the op's zone")]
    NotInZone(String),

    /// A tracked global-memory qubit lost its partition.
    #[error("global-memory tracking lost for qubit '{0}'")]
    Untracked(String),

    /// A move did not match any legal teleportation pattern.
    #[error("illegal teleportation move for qubit '{0}'")]
    IllegalTeleport(String),

    /// A teleport tuple slot held the wrong qubit kind.
    #[error("teleport tuple slot for '{id}' must be {expected}")]
    TupleKindMismatch {
        /// The offending qubit.
        id: String,
        /// The kind the slot requires.
        expected: &'static str,
    },

    /// A childless instruction completed with no qubit left to delete.
    #[error("childless instruction completed but qubit '{0}' was already gone")]
    ChildlessNoQubit(String),

    /// The greedy issue policy failed to drain the ready queue.
    #[error("greedy issue left {0} instructions in the ready queue")]
    GreedyBacklog(usize),

    /// Nothing executing, nothing issuable, instructions still pending.
    #[error("simulator deadlocked in leaf '{leaf}' with {pending} instructions pending")]
    Deadlock {
        /// Leaf being simulated.
        leaf: String,
        /// Instructions that can never retire.
        pending: usize,
    },

    /// An op instruction was prefetched from the next module.
    #[error("op instruction {0} prefetched across a module boundary")]
    PrefetchedOp(u32),

    /// An executing qubit was neither moving nor in an op.
    #[error("executing qubit '{0}' is idle")]
    ExecutingIdle(String),

    /// No leaf program registered under this name.
    #[error("no expanded program for leaf '{0}'")]
    UnknownLeaf(String),
}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
