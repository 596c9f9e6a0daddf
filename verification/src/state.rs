//! Liveness challenge state tracking.

use ekyc_types::ChallengeType;
use serde::{Deserialize, Serialize};

/// Current state of the challenge engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeState {
    /// Waiting for a live capture session.
    Idle,
    /// Drawing the next challenge type.
    Selecting,
    /// Instruction shown; auto-attempt timer armed.
    Presenting,
    /// Evaluation call in flight.
    Attempting,
    /// Last attempt passed; `Correct!` stays up until the pause ends.
    Passed,
    /// Last attempt failed; waiting for the user to retry.
    Retrying,
    /// Every challenge type passed. Terminal.
    AllDone,
}

impl ChallengeState {
    /// Whether an attempt may start from this state.
    pub fn accepts_attempt(&self) -> bool {
        matches!(self, Self::Presenting | Self::Retrying)
    }

    /// No further challenges or attempts.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AllDone)
    }
}

/// What started an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptTrigger {
    /// The auto-attempt timer expired.
    Auto,
    /// The user pressed the attempt or retry affordance.
    Manual,
}

/// Result of one attempt that reached the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Passed(ChallengeType),
    NotMet(ChallengeType),
}

/// The inline message the liveness stage displays.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    Preparing,
    Instruction {
        index: usize,
        total: usize,
        instruction: String,
    },
    Attempting { instruction: String },
    Correct,
    NotMet,
    ServiceFailed { message: String },
    CameraUnavailable,
    AllCompleted,
}

impl Feedback {
    pub fn message(&self) -> String {
        match self {
            Self::Preparing => "Please prepare for liveness detection challenges...".to_string(),
            Self::Instruction {
                index,
                total,
                instruction,
            } => format!("Challenge {index}/{total}: {instruction}"),
            Self::Attempting { instruction } => format!("Attempting: {instruction}"),
            Self::Correct => "Correct!".to_string(),
            Self::NotMet => "Challenge not met. Please try again.".to_string(),
            Self::ServiceFailed { message } => message.clone(),
            Self::CameraUnavailable => {
                "Could not access camera. Please check permissions.".to_string()
            }
            Self::AllCompleted => "All liveness challenges completed successfully!".to_string(),
        }
    }

    /// Whether the retry affordance should be visible with this feedback.
    pub fn offers_retry(&self) -> bool {
        matches!(self, Self::NotMet | Self::ServiceFailed { .. })
    }
}
