use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("capture session is closed")]
    SessionClosed,

    #[error("failed to encode still frame: {0}")]
    Encoding(String),
}
