//! The verification wizard: the stage orchestrator plus the controller of
//! the active stage.
//!
//! Every transition tears the exiting controller down (timer cancelled,
//! camera released) before the entering controller initialises.

use ekyc_capture::{Camera, CaptureSession};
use ekyc_services::VerificationServices;
use ekyc_types::{Image, Stage, VerificationRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::challenge::{ChallengeEngine, ChallengeEvent};
use crate::config::WizardConfig;
use crate::document::DocumentStage;
use crate::error::VerificationError;
use crate::live::LiveCaptureStage;
use crate::orchestrator::{StageOrchestrator, WizardEvent};
use crate::state::{AttemptOutcome, AttemptTrigger, ChallengeState};
use crate::summary::{summarize, DisplayResult};

pub type LivenessEngine<S, C> = ChallengeEngine<S, C, StdRng>;

/// Controller of the active stage.
#[derive(Debug)]
pub enum ActiveStage<S: VerificationServices, C: Camera> {
    Document(DocumentStage<S>),
    Live(LiveCaptureStage<S, C>),
    Liveness(LivenessEngine<S, C>),
    Results(DisplayResult),
}

impl<S: VerificationServices, C: Camera> ActiveStage<S, C> {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Document(_) => Stage::DocumentUpload,
            Self::Live(_) => Stage::LiveCapture,
            Self::Liveness(_) => Stage::LivenessChallenge,
            Self::Results(_) => Stage::Results,
        }
    }

    fn teardown(&mut self) {
        match self {
            Self::Live(live) => live.close(),
            Self::Liveness(engine) => engine.teardown(),
            Self::Document(_) | Self::Results(_) => {}
        }
    }
}

/// Drives one verification session from document upload to results.
#[derive(Debug)]
pub struct Wizard<S: VerificationServices, C: Camera> {
    orchestrator: StageOrchestrator,
    active: ActiveStage<S, C>,
    services: Arc<S>,
    camera: Arc<C>,
    config: WizardConfig,
    rng: StdRng,
}

impl<S: VerificationServices, C: Camera> Wizard<S, C> {
    /// Start a session at [`Stage::DocumentUpload`].
    ///
    /// `rng` drives challenge selection only; outcome randomness belongs to
    /// the services.
    pub fn new(services: Arc<S>, camera: Arc<C>, config: WizardConfig, rng: StdRng) -> Self {
        tracing::info!(
            services = services.name(),
            camera = camera.name(),
            "verification wizard started"
        );
        Self {
            orchestrator: StageOrchestrator::new(),
            active: ActiveStage::Document(DocumentStage::new(Arc::clone(&services))),
            services,
            camera,
            config,
            rng,
        }
    }

    pub fn stage(&self) -> Stage {
        self.orchestrator.stage()
    }

    pub fn record(&self) -> &VerificationRecord {
        self.orchestrator.record()
    }

    pub fn history(&self) -> &[Stage] {
        self.orchestrator.history()
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn active(&self) -> &ActiveStage<S, C> {
        &self.active
    }

    pub fn document(&self) -> Option<&DocumentStage<S>> {
        match &self.active {
            ActiveStage::Document(stage) => Some(stage),
            _ => None,
        }
    }

    pub fn live(&self) -> Option<&LiveCaptureStage<S, C>> {
        match &self.active {
            ActiveStage::Live(stage) => Some(stage),
            _ => None,
        }
    }

    pub fn liveness(&self) -> Option<&LivenessEngine<S, C>> {
        match &self.active {
            ActiveStage::Liveness(engine) => Some(engine),
            _ => None,
        }
    }

    /// The summary, once the results stage is active.
    pub fn results(&self) -> Option<&DisplayResult> {
        match &self.active {
            ActiveStage::Results(result) => Some(result),
            _ => None,
        }
    }

    /// Orchestrator events since the last call.
    pub fn drain_events(&mut self) -> Vec<WizardEvent> {
        self.orchestrator.drain_events()
    }

    /// Challenge engine events since the last call. Empty outside the
    /// liveness stage.
    pub fn drain_challenge_events(&mut self) -> Vec<ChallengeEvent> {
        match &mut self.active {
            ActiveStage::Liveness(engine) => engine.drain_events(),
            _ => Vec::new(),
        }
    }

    // ── Stage actions ──────────────────────────────────────────────────

    pub async fn submit_document(&mut self, document: Image) -> Result<bool, VerificationError> {
        match &mut self.active {
            ActiveStage::Document(stage) => stage.submit(document).await,
            _ => Err(VerificationError::StageNotActive(Stage::DocumentUpload)),
        }
    }

    pub fn clear_document(&mut self) -> Result<(), VerificationError> {
        match &mut self.active {
            ActiveStage::Document(stage) => {
                stage.clear();
                Ok(())
            }
            _ => Err(VerificationError::StageNotActive(Stage::DocumentUpload)),
        }
    }

    pub async fn capture_and_verify(&mut self) -> Result<bool, VerificationError> {
        match &mut self.active {
            ActiveStage::Live(stage) => stage.capture_and_verify().await,
            _ => Err(VerificationError::StageNotActive(Stage::LiveCapture)),
        }
    }

    /// Ask for camera access again after a denial.
    pub async fn retry_camera(&mut self) -> Result<(), VerificationError> {
        let rate = self.config.frame_sample_rate_hz;
        match &mut self.active {
            ActiveStage::Live(stage) => stage.open_camera(Arc::clone(&self.camera), rate).await,
            ActiveStage::Liveness(engine) if !engine.has_live_session() => {
                match CaptureSession::open(Arc::clone(&self.camera), rate).await {
                    Ok(session) => engine.start(session),
                    Err(e) => {
                        engine.camera_unavailable();
                        Err(e.into())
                    }
                }
            }
            ActiveStage::Liveness(_) => Ok(()),
            other => Err(VerificationError::InvalidTransition {
                stage: other.stage(),
                action: "open the camera",
            }),
        }
    }

    /// Wait for the auto-attempt timer and run the attempt it triggers.
    pub async fn step_challenge(&mut self) -> Result<Option<AttemptOutcome>, VerificationError> {
        match &mut self.active {
            ActiveStage::Liveness(engine) => engine.step().await,
            _ => Err(VerificationError::StageNotActive(Stage::LivenessChallenge)),
        }
    }

    /// Attempt the current challenge without waiting for the timer.
    pub async fn attempt_challenge(&mut self) -> Result<AttemptOutcome, VerificationError> {
        match &mut self.active {
            ActiveStage::Liveness(engine) => engine.attempt(AttemptTrigger::Manual).await,
            _ => Err(VerificationError::StageNotActive(Stage::LivenessChallenge)),
        }
    }

    pub async fn retry_challenge(&mut self) -> Result<AttemptOutcome, VerificationError> {
        match &mut self.active {
            ActiveStage::Liveness(engine) => engine.retry().await,
            _ => Err(VerificationError::StageNotActive(Stage::LivenessChallenge)),
        }
    }

    /// Skip the rest of the pause after a passed challenge.
    pub fn next_challenge(&mut self) -> Result<ChallengeState, VerificationError> {
        match &mut self.active {
            ActiveStage::Liveness(engine) => engine.next_challenge(),
            _ => Err(VerificationError::StageNotActive(Stage::LivenessChallenge)),
        }
    }

    // ── Navigation ─────────────────────────────────────────────────────

    /// Proceed with the active stage's output.
    ///
    /// Refused until the stage's completion predicate holds.
    pub async fn advance(&mut self) -> Result<Stage, VerificationError> {
        let output = match &self.active {
            ActiveStage::Document(stage) => stage.completion(),
            ActiveStage::Live(stage) => stage.completion(),
            ActiveStage::Liveness(engine) => engine.completion(),
            ActiveStage::Results(_) => {
                return Err(VerificationError::InvalidTransition {
                    stage: Stage::Results,
                    action: "advance",
                })
            }
        }
        .ok_or(VerificationError::StageNotComplete(self.stage()))?;

        let next = self.orchestrator.advance(output)?;
        self.active.teardown();
        self.enter(next).await;
        Ok(next)
    }

    /// Move one stage back. A no-op on the first stage.
    pub async fn go_back(&mut self) -> Result<Stage, VerificationError> {
        let current = self.stage();
        let previous = self.orchestrator.go_back()?;
        if previous != current {
            self.active.teardown();
            self.enter(previous).await;
        }
        Ok(previous)
    }

    /// Clear the record and return to document upload.
    pub fn reset(&mut self) -> Stage {
        self.active.teardown();
        let stage = self.orchestrator.reset();
        self.active = ActiveStage::Document(DocumentStage::new(Arc::clone(&self.services)));
        stage
    }

    async fn enter(&mut self, stage: Stage) {
        let rate = self.config.frame_sample_rate_hz;
        self.active = match stage {
            Stage::DocumentUpload => {
                ActiveStage::Document(DocumentStage::new(Arc::clone(&self.services)))
            }
            Stage::LiveCapture => {
                let mut live = LiveCaptureStage::new(Arc::clone(&self.services));
                if let Err(e) = live.open_camera(Arc::clone(&self.camera), rate).await {
                    tracing::warn!(error = %e, "live capture blocked");
                }
                ActiveStage::Live(live)
            }
            Stage::LivenessChallenge => {
                let rng = StdRng::seed_from_u64(self.rng.gen());
                let mut engine = ChallengeEngine::new(
                    Arc::clone(&self.services),
                    rng,
                    self.config.auto_attempt_delay(),
                )
                .with_next_challenge_delay(self.config.next_challenge_delay());
                match CaptureSession::open(Arc::clone(&self.camera), rate).await {
                    Ok(session) => {
                        if let Err(e) = engine.start(session) {
                            tracing::warn!(error = %e, "challenge engine failed to start");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "liveness challenges blocked");
                        engine.camera_unavailable();
                    }
                }
                ActiveStage::Liveness(engine)
            }
            Stage::Results => {
                let result = summarize(self.orchestrator.record());
                tracing::info!(
                    verified = result.face_verified,
                    all_passed = result.all_passed,
                    "verification finished"
                );
                ActiveStage::Results(result)
            }
        };
    }
}

impl<S: VerificationServices, C: Camera> Drop for Wizard<S, C> {
    fn drop(&mut self) {
        self.active.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekyc_nullables::{NullCamera, NullServices};
    use ekyc_types::ImageFormat;

    fn wizard(camera: Arc<NullCamera>) -> Wizard<NullServices, NullCamera> {
        let config = WizardConfig {
            frame_sample_rate_hz: 1,
            ..WizardConfig::default()
        };
        Wizard::new(
            Arc::new(NullServices::new()),
            camera,
            config,
            StdRng::seed_from_u64(9),
        )
    }

    fn document() -> Image {
        Image::new(ImageFormat::Jpeg, vec![0xFF, 0xD8, 0xFF, 0xD9]).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn advance_requires_completion() {
        let mut wizard = wizard(Arc::new(NullCamera::available()));
        let err = wizard.advance().await.unwrap_err();
        assert!(matches!(err, VerificationError::StageNotComplete(Stage::DocumentUpload)));

        wizard.submit_document(document()).await.unwrap();
        assert_eq!(wizard.advance().await.unwrap(), Stage::LiveCapture);
        assert!(wizard.live().is_some_and(|l| l.has_live_session()));
    }

    #[tokio::test(start_paused = true)]
    async fn actions_for_inactive_stages_are_refused() {
        let mut wizard = wizard(Arc::new(NullCamera::available()));
        assert!(matches!(
            wizard.capture_and_verify().await,
            Err(VerificationError::StageNotActive(Stage::LiveCapture))
        ));
        assert!(wizard.step_challenge().await.is_err());
        assert!(wizard.retry_camera().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn camera_moves_between_stages_without_overlap() {
        let camera = Arc::new(NullCamera::available());
        let mut wizard = wizard(Arc::clone(&camera));
        wizard.submit_document(document()).await.unwrap();
        wizard.advance().await.unwrap();
        wizard.capture_and_verify().await.unwrap();
        wizard.advance().await.unwrap();

        assert_eq!(wizard.stage(), Stage::LivenessChallenge);
        assert_eq!(camera.open_handles(), 1);
        assert_eq!(camera.acquisitions(), 2);
        assert!(wizard.liveness().is_some_and(|e| e.has_pending_timer()));

        wizard.go_back().await.unwrap();
        assert_eq!(camera.open_handles(), 1);
        assert_eq!(camera.acquisitions(), 3);

        wizard.reset();
        assert_eq!(camera.open_handles(), 0);
        assert!(wizard.record().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_document_blocks_advance() {
        let mut wizard = wizard(Arc::new(NullCamera::available()));
        wizard.submit_document(document()).await.unwrap();
        wizard.clear_document().unwrap();
        assert!(wizard.document().is_some_and(|d| d.document().is_none()));
        assert!(matches!(
            wizard.advance().await,
            Err(VerificationError::StageNotComplete(Stage::DocumentUpload))
        ));

        wizard.submit_document(document()).await.unwrap();
        wizard.advance().await.unwrap();
        assert!(matches!(
            wizard.clear_document(),
            Err(VerificationError::StageNotActive(Stage::DocumentUpload))
        ));
        assert!(wizard.record().document_image.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_releases_active_camera() {
        let camera = Arc::new(NullCamera::available());
        let mut wizard = wizard(Arc::clone(&camera));
        wizard.submit_document(document()).await.unwrap();
        wizard.advance().await.unwrap();
        drop(wizard);
        assert_eq!(camera.open_handles(), 0);
    }
}
