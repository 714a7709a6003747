use arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use thiserror::Error;

/// Error classes a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Invalid,
    FailedPrecondition,
    Internal,
}

#[derive(Debug, Error)]
pub enum AggWindowError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Arrow(#[from] ArrowError),

    #[error(transparent)]
    DataFusion(#[from] DataFusionError),
}

impl AggWindowError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AggWindowError::Invalid(msg.into())
    }

    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        AggWindowError::FailedPrecondition(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AggWindowError::Internal(msg.into())
    }

    pub fn schema_collision(column: &str, existing: impl std::fmt::Display, found: impl std::fmt::Display) -> Self {
        AggWindowError::FailedPrecondition(format!(
            "schema collision: column \"{}\" is {} but a previous chunk had {}",
            column, found, existing
        ))
    }

    /// An owned copy with the same code and message, for reporting a failure that was also returned.
    pub fn detached(&self) -> Self {
        match self {
            AggWindowError::Invalid(msg) => AggWindowError::Invalid(msg.clone()),
            AggWindowError::FailedPrecondition(msg) => AggWindowError::FailedPrecondition(msg.clone()),
            AggWindowError::Internal(msg) => AggWindowError::Internal(msg.clone()),
            other => AggWindowError::Internal(other.to_string()),
        }
    }

    pub fn code(&self) -> Code {
        match self {
            AggWindowError::Invalid(_) => Code::Invalid,
            AggWindowError::FailedPrecondition(_) => Code::FailedPrecondition,
            AggWindowError::Internal(_) | AggWindowError::Arrow(_) | AggWindowError::DataFusion(_) => Code::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggWindowError>;

/// Extracts the error code from an `anyhow` error produced anywhere in the crate.
pub fn error_code(err: &anyhow::Error) -> Option<Code> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<AggWindowError>())
        .map(AggWindowError::code)
}
