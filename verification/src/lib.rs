//! eKYC verification flow.
//!
//! Walks a user through four stages:
//! 1. **Document upload**: a face must be found on the identity document.
//! 2. **Live capture**: a live still is matched against the document face.
//! 3. **Liveness challenges**: blink, head turn and emotion, in random order,
//!    each attempted automatically after a delay or on demand, retried until
//!    passed.
//! 4. **Results**: a read-only summary of the accumulated record.
//!
//! The [`StageOrchestrator`] owns the record and the stage sequence. The
//! [`Wizard`] wraps it with the controller of the active stage and hands the
//! camera from stage to stage. Biometric work is delegated to a
//! [`ekyc_services::VerificationServices`] backend.

pub mod challenge;
pub mod config;
pub mod document;
pub mod error;
pub mod live;
pub mod orchestrator;
pub mod state;
pub mod summary;
pub mod wizard;

pub use challenge::{ChallengeEngine, ChallengeEvent};
pub use config::WizardConfig;
pub use document::DocumentStage;
pub use error::{ErrorKind, VerificationError};
pub use live::{LiveCaptureStage, LiveMatch};
pub use orchestrator::{StageOrchestrator, WizardEvent};
pub use state::{AttemptOutcome, AttemptTrigger, ChallengeState, Feedback};
pub use summary::{display_score, summarize, DisplayResult, LivenessLine};
pub use wizard::{ActiveStage, LivenessEngine, Wizard};
