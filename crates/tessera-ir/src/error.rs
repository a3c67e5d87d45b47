//! Error types for the IR crate.

use thiserror::Error;

/// Errors that can occur constructing IR values.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Gate name not in the intrinsic op set.
    #[error("unknown gate '{0}'")]
    UnknownGate(String),

    /// Gate applied to the wrong number of operands.
    #[error("gate '{gate}' takes {expected} operand(s), got {got}")]
    OperandCountMismatch {
        /// Name of the gate.
        gate: &'static str,
        /// Expected operand count.
        expected: u32,
        /// Actual operand count.
        got: u32,
    },

    /// Sequence number referenced but not present in the DAG.
    #[error("sequence number {0} not found in dependency graph")]
    UnknownSeq(u32),
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
