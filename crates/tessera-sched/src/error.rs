//! Error types for the scheduler.

use thiserror::Error;

/// Errors that can occur during module scheduling.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedError {
    /// A non-leaf body references a module with no schedule yet.
    #[error("module '{module}' calls '{callee}' which has no profile")]
    MissingProfile {
        /// The calling module.
        module: String,
        /// The unresolved callee.
        callee: String,
    },

    /// A non-leaf module with an empty body cannot be composed.
    #[error("non-leaf module '{0}' has an empty body")]
    EmptyBody(String),

    /// Call-graph modules could not be ordered (mutual recursion).
    #[error("call graph contains a cycle involving '{0}'")]
    RecursiveCallGraph(String),
}

/// Result type for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;
