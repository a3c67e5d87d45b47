//! Error types for trace I/O.

use thiserror::Error;

/// Errors that can occur parsing schedule traces or writing reports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TraceError {
    /// Underlying file I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A line did not match the expected shape.
    #[error("line {line}: {reason}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// An op name was not in the intrinsic set.
    #[error("line {line}: {source}")]
    BadGate {
        /// 1-based line number.
        line: usize,
        /// The gate error.
        source: tessera_ir::IrError,
    },
}

impl TraceError {
    /// Convenience constructor for malformed lines.
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        TraceError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type for trace operations.
pub type TraceResult<T> = Result<T, TraceError>;
