// error.rs - Failure taxonomy shared by every analysis entry point

use thiserror::Error;

/// Everything a trace analysis can reject with. Each variant carries
/// enough context (index, step, length) to diagnose the failing call
/// without re-running it; nothing is retried internally.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A caller-supplied parameter is outside its documented domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A requested step has no exact sample in the step axis.
    /// No interpolation is ever performed.
    #[error("no sample recorded at step {step}")]
    LookupFailure { step: i64 },

    /// Too little data remains to evaluate the requested estimator.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A ratio or weighted sum has a zero denominator.
    #[error("undefined ratio: {0}")]
    UndefinedRatio(String),

    /// Two arrays expected to correspond positionally do not.
    #[error("alignment mismatch: {0}")]
    AlignmentMismatch(String),

    /// The trace file violates the documented column layout.
    #[error("malformed trace: {0}")]
    MalformedTrace(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    /// Shorthand for the common parameter-rejection case.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
