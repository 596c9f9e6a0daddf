use thiserror::Error;

/// A failed call to a verification service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("processing failed: {0}")]
    Processing(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
