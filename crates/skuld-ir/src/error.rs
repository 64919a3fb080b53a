//! Error types for the IR crate.

use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// A gate references a qubit outside the kernel's qubit range.
    #[error("qubit index {index} out of range (kernel has {count} qubits){}", format_gate_context(.gate_name))]
    QubitOutOfRange {
        /// The offending index.
        index: u32,
        /// Number of qubits in the kernel.
        count: u32,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// A gate references a creg outside the kernel's creg range.
    #[error("creg index {index} out of range (kernel has {count} cregs){}", format_gate_context(.gate_name))]
    CregOutOfRange {
        /// The offending index.
        index: u32,
        /// Number of cregs in the kernel.
        count: u32,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// A gate references a breg outside the kernel's breg range.
    #[error("breg index {index} out of range (kernel has {count} bregs){}", format_gate_context(.gate_name))]
    BregOutOfRange {
        /// The offending index.
        index: u32,
        /// Number of bregs in the kernel.
        count: u32,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// The same qubit appears twice in one gate's operand list.
    #[error("duplicate qubit operand {index}{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicated index.
        index: u32,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// A condition was given the wrong number of breg operands.
    #[error("condition {condition} takes {expected} operand(s), got {got}")]
    ConditionArity {
        /// Name of the condition kind.
        condition: &'static str,
        /// Required operand count.
        expected: usize,
        /// Actual operand count.
        got: usize,
    },

    /// An operation that requires a scheduled kernel was called before
    /// scheduling.
    #[error("kernel '{0}' has no valid cycle information")]
    CyclesNotValid(String),

    /// The platform descriptor is malformed.
    #[error("invalid platform: {0}")]
    InvalidPlatform(String),
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
