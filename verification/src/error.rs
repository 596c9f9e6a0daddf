use ekyc_capture::CaptureError;
use ekyc_services::ServiceError;
use ekyc_types::Stage;
use thiserror::Error;

use crate::state::ChallengeState;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("service call failed: {0}")]
    ServiceCallFailed(#[from] ServiceError),

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("stage {0} has not completed")]
    StageNotComplete(Stage),

    #[error("output of stage {actual} cannot advance stage {expected}")]
    StageMismatch { expected: Stage, actual: Stage },

    #[error("cannot {action} from stage {stage}")]
    InvalidTransition { stage: Stage, action: &'static str },

    #[error("stage {0} is not active")]
    StageNotActive(Stage),

    #[error("cannot {action} while challenge engine is {state:?}")]
    InvalidChallengeState {
        state: ChallengeState,
        action: &'static str,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl From<CaptureError> for VerificationError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::CameraUnavailable(reason) => Self::CameraUnavailable(reason),
            other => Self::Capture(other.to_string()),
        }
    }
}

/// Coarse classification of a [`VerificationError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Device denied or absent; blocks the current stage.
    CameraUnavailable,
    /// A collaborator failed; the same action may be retried.
    ServiceCallFailed,
    /// The requested action is not valid in the current state.
    InvalidTransition,
    Config,
}

impl VerificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CameraUnavailable(_) => ErrorKind::CameraUnavailable,
            Self::ServiceCallFailed(_) | Self::Capture(_) => ErrorKind::ServiceCallFailed,
            Self::StageNotComplete(_)
            | Self::StageMismatch { .. }
            | Self::InvalidTransition { .. }
            | Self::StageNotActive(_)
            | Self::InvalidChallengeState { .. } => ErrorKind::InvalidTransition,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether repeating the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ServiceCallFailed
    }
}
