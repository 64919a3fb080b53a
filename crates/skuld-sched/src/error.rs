//! Error types for the scheduler crate.

use thiserror::Error;

/// User-facing errors from dependency analysis and scheduling.
///
/// Internal invariant violations (a cyclic dependency graph, an undefined
/// cycle after scheduling) are bugs and panic instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedError {
    /// A named gate appeared with the wrong number of qubit operands.
    #[error("gate '{gate}' takes {expected} qubit operand(s), got {got}")]
    OperandCount {
        /// The gate's base name.
        gate: String,
        /// Required operand count.
        expected: usize,
        /// Actual operand count.
        got: usize,
    },

    /// Error bubbled up from the IR layer.
    #[error(transparent)]
    Ir(#[from] skuld_ir::IrError),
}

/// Result type for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;
