//! Liveness challenges: the fixed set of types and their parameterised instructions.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of liveness test. Each is used at most once per session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChallengeType {
    Blink,
    Orientation,
    Emotion,
}

impl ChallengeType {
    /// Every challenge type, in canonical order.
    pub const ALL: [ChallengeType; 3] = [Self::Blink, Self::Orientation, Self::Emotion];

    /// Label shown on the results summary.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Blink => "Blink Detection",
            Self::Orientation => "Face Orientation",
            Self::Emotion => "Emotion Detection",
        }
    }
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Blink => "blink",
            Self::Orientation => "orientation",
            Self::Emotion => "emotion",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    Smile,
    Surprise,
}

/// The parameter the user is asked to perform for a given challenge type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengePrompt {
    /// Blink a number of times (2 to 4).
    Blink { count: u8 },
    /// Turn the head towards one side.
    Orientation { direction: Direction },
    /// Show an emotion.
    Emotion { emotion: Emotion },
}

impl ChallengePrompt {
    /// Draw a random prompt for `kind`.
    pub fn random<R: Rng + ?Sized>(kind: ChallengeType, rng: &mut R) -> Self {
        match kind {
            ChallengeType::Blink => Self::Blink {
                count: rng.gen_range(2..=4),
            },
            ChallengeType::Orientation => Self::Orientation {
                direction: if rng.gen_bool(0.5) {
                    Direction::Left
                } else {
                    Direction::Right
                },
            },
            ChallengeType::Emotion => Self::Emotion {
                emotion: if rng.gen_bool(0.5) {
                    Emotion::Smile
                } else {
                    Emotion::Surprise
                },
            },
        }
    }

    pub fn kind(&self) -> ChallengeType {
        match self {
            Self::Blink { .. } => ChallengeType::Blink,
            Self::Orientation { .. } => ChallengeType::Orientation,
            Self::Emotion { .. } => ChallengeType::Emotion,
        }
    }

    /// Human-readable instruction for this prompt.
    pub fn instruction(&self) -> String {
        match self {
            Self::Blink { count } => format!("Please blink your eyes {count} times."),
            Self::Orientation { direction } => {
                let side = match direction {
                    Direction::Left => "left",
                    Direction::Right => "right",
                };
                format!("Please turn your head slowly to the {side}.")
            }
            Self::Emotion { emotion: Emotion::Smile } => "Please smile.".to_string(),
            Self::Emotion {
                emotion: Emotion::Surprise,
            } => "Please show surprise.".to_string(),
        }
    }
}

/// One liveness test instance.
///
/// A failed challenge is retried as the same instance; it is never replaced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub kind: ChallengeType,
    pub prompt: ChallengePrompt,
    pub instruction: String,
}

impl Challenge {
    pub fn new(prompt: ChallengePrompt) -> Self {
        Self {
            kind: prompt.kind(),
            instruction: prompt.instruction(),
            prompt,
        }
    }

    /// Build a challenge of `kind` with a randomly drawn prompt.
    pub fn random<R: Rng + ?Sized>(kind: ChallengeType, rng: &mut R) -> Self {
        Self::new(ChallengePrompt::random(kind, rng))
    }
}
