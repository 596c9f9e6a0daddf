//! Error type for constructing core values.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("image payload is empty")]
    EmptyImage,
}
