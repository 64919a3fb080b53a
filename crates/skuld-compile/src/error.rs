//! Error types for the compilation crate.

use thiserror::Error;

/// Errors that can occur while building or running a compilation strategy.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] skuld_ir::IrError),

    /// Error from the scheduler crate.
    #[error("scheduler error: {0}")]
    Sched(#[from] skuld_sched::SchedError),

    /// No pass type registered under this name.
    #[error("unknown pass type '{0}'")]
    UnknownPassType(String),

    /// A pass path did not resolve to a pass.
    #[error("no pass matches target '{0}'")]
    UnresolvedPath(String),

    /// The target of a structural operation is not a group.
    #[error("pass '{0}' is not a group")]
    NotAGroup(String),

    /// An instance name is not a valid identifier.
    #[error("invalid pass instance name '{0}'")]
    InvalidInstanceName(String),

    /// Two passes in one group would share an instance name.
    #[error("duplicate pass instance name '{0}'")]
    DuplicateInstanceName(String),

    /// A pass has no option with this name.
    #[error("pass has no option named '{0}'")]
    UnknownOption(String),

    /// An option value is outside its declared domain.
    #[error("invalid value '{value}' for option '{option}': {reason}")]
    InvalidOptionValue {
        /// The option's name.
        option: String,
        /// The rejected text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An option was set after its pass was constructed.
    #[error("option '{0}' cannot be set: pass already constructed")]
    OptionFrozen(String),

    /// An option path with `must_exist` matched no pass with that option.
    #[error("option path '{0}' did not affect any pass")]
    NoPassAffected(String),

    /// The pass is configured inconsistently.
    #[error("invalid pass configuration: {0}")]
    InvalidConfiguration(String),

    /// A structural mutation targeted a conditional group.
    #[error("group '{0}' is conditional and cannot be flattened")]
    ConditionalGroup(String),

    /// `group_sub_passes` endpoints live in different groups.
    #[error("range endpoints '{from}' and '{to}' do not share a hierarchical prefix")]
    RangePrefixMismatch {
        /// The range start target.
        from: String,
        /// The range end target.
        to: String,
    },

    /// A pass reported failure; carries the fully qualified pass path.
    #[error("pass '{pass}' failed: {reason}")]
    PassFailed {
        /// Dotted path of the failing pass.
        pass: String,
        /// Rendering of the underlying failure.
        reason: String,
    },

    /// Writing an output artifact failed.
    #[error("cannot write '{path}': {source}")]
    Io {
        /// Target path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
