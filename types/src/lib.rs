//! Fundamental types for the eKYC verification flow.
//!
//! This crate defines the types shared by every other crate in the workspace:
//! encoded images, liveness challenges, wizard stages, and the accumulated
//! verification record with the per-stage outputs merged into it.

pub mod challenge;
pub mod error;
pub mod image;
pub mod record;
pub mod stage;

pub use challenge::{Challenge, ChallengePrompt, ChallengeType, Direction, Emotion};
pub use error::TypesError;
pub use image::{Image, ImageFormat};
pub use record::{LivenessResults, StageOutput, VerificationRecord};
pub use stage::Stage;
