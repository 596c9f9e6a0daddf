//! Wizard stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One top-level step of the verification wizard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// Upload of the identity document; a face must be found on it.
    DocumentUpload,
    /// Live camera capture matched against the document face.
    LiveCapture,
    /// Randomised liveness challenges.
    LivenessChallenge,
    /// Read-only summary; left only through a full reset.
    Results,
}

impl Stage {
    /// The stage a completed forward transition leads to.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::DocumentUpload => Some(Self::LiveCapture),
            Self::LiveCapture => Some(Self::LivenessChallenge),
            Self::LivenessChallenge => Some(Self::Results),
            Self::Results => None,
        }
    }

    /// The stage one step back, if back navigation is defined.
    pub fn previous(&self) -> Option<Stage> {
        match self {
            Self::DocumentUpload => None,
            Self::LiveCapture => Some(Self::DocumentUpload),
            Self::LivenessChallenge => Some(Self::LiveCapture),
            Self::Results => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentUpload => "document_upload",
            Self::LiveCapture => "live_capture",
            Self::LivenessChallenge => "liveness_challenge",
            Self::Results => "results",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
