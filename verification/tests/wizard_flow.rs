//! End-to-end scenarios through the verification wizard:
//! document upload → live capture → liveness challenges → results.
//!
//! Collaborators are the deterministic nullables; timers run on paused
//! tokio time, so the 12 s auto-attempt delay costs nothing.

use std::sync::Arc;
use std::time::Duration;

use ekyc_capture::SimulatedCamera;
use ekyc_nullables::{NullCamera, NullServices};
use ekyc_services::{FaceExtraction, ServiceError, SimulatedServices, SimulationConfig};
use ekyc_types::{ChallengeType, Image, ImageFormat, Stage};
use ekyc_verification::{
    AttemptOutcome, ChallengeEvent, ChallengeState, ErrorKind, VerificationError, Wizard,
    WizardConfig, WizardEvent,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn document() -> Image {
    Image::new(ImageFormat::Jpeg, vec![0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xD9]).expect("image")
}

fn wizard(
    services: Arc<NullServices>,
    camera: Arc<NullCamera>,
) -> Wizard<NullServices, NullCamera> {
    Wizard::new(services, camera, WizardConfig::default(), StdRng::seed_from_u64(17))
}

/// Drive the wizard from document upload to the liveness stage.
async fn reach_liveness(wizard: &mut Wizard<NullServices, NullCamera>) {
    assert!(wizard.submit_document(document()).await.expect("extraction"));
    assert_eq!(wizard.advance().await.expect("advance"), Stage::LiveCapture);
    assert!(wizard.capture_and_verify().await.expect("match"));
    assert_eq!(wizard.advance().await.expect("advance"), Stage::LivenessChallenge);
}

// ---------------------------------------------------------------------------
// 1. Happy path
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn happy_path_reaches_verified_results() {
    let services = Arc::new(NullServices::new());
    let camera = Arc::new(NullCamera::available());
    let mut wizard = wizard(Arc::clone(&services), Arc::clone(&camera));

    reach_liveness(&mut wizard).await;
    for _ in 0..3 {
        let outcome = wizard.step_challenge().await.expect("attempt");
        assert!(matches!(outcome, Some(AttemptOutcome::Passed(_))));
        let engine = wizard.liveness().expect("liveness stage");
        assert_eq!(engine.feedback().message(), "Correct!");
    }
    assert_eq!(wizard.step_challenge().await.expect("pause"), None);
    assert_eq!(
        wizard.liveness().map(|e| e.state()),
        Some(ChallengeState::AllDone)
    );
    assert_eq!(wizard.advance().await.expect("advance"), Stage::Results);

    let result = wizard.results().expect("results stage");
    assert!(result.face_verified);
    assert_eq!(result.status, "MATCH (VERIFIED)");
    assert_eq!(result.display_score, "69.7");
    assert_eq!(result.liveness.len(), 3);
    assert!(result.liveness.iter().all(|l| l.passed));
    assert!(result.all_passed);
    assert!(result.document_face_image.is_some());

    assert_eq!(camera.open_handles(), 0);
    assert_eq!(services.calls().extract_face, 1);
    assert_eq!(services.calls().match_face, 1);
    assert_eq!(
        wizard.history(),
        [
            Stage::DocumentUpload,
            Stage::LiveCapture,
            Stage::LivenessChallenge,
            Stage::Results
        ]
    );
}

// ---------------------------------------------------------------------------
// 2. Camera denied on live capture
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn camera_denied_blocks_live_capture_until_back() {
    let camera = Arc::new(NullCamera::denied());
    let mut wizard = wizard(Arc::new(NullServices::new()), Arc::clone(&camera));

    wizard.submit_document(document()).await.expect("extraction");
    assert_eq!(wizard.advance().await.expect("advance"), Stage::LiveCapture);

    let live = wizard.live().expect("live stage");
    assert!(live.camera_blocked());
    assert_eq!(
        live.message(),
        Some("Could not access camera. Please check permissions and try again.")
    );

    let err = wizard.capture_and_verify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CameraUnavailable);
    let err = wizard.advance().await.unwrap_err();
    assert!(matches!(err, VerificationError::StageNotComplete(Stage::LiveCapture)));

    assert_eq!(wizard.go_back().await.expect("back"), Stage::DocumentUpload);
    assert_eq!(camera.open_handles(), 0);
    assert!(wizard.record().document_face_image.is_some());
}

#[tokio::test(start_paused = true)]
async fn camera_granted_on_retry_unblocks_stage() {
    let camera = Arc::new(NullCamera::denied());
    let mut wizard = wizard(Arc::new(NullServices::new()), Arc::clone(&camera));
    wizard.submit_document(document()).await.expect("extraction");
    wizard.advance().await.expect("advance");

    camera.set_available(true);
    wizard.retry_camera().await.expect("camera opens");
    assert!(wizard.capture_and_verify().await.expect("match"));
    assert_eq!(wizard.advance().await.expect("advance"), Stage::LivenessChallenge);
}

// ---------------------------------------------------------------------------
// 3. Challenge failure and retry
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn failed_challenge_retried_once_is_recorded_once() {
    let services = Arc::new(NullServices::new());
    services.push_challenges([Ok(false)]);
    let mut wizard = wizard(Arc::clone(&services), Arc::new(NullCamera::available()));
    reach_liveness(&mut wizard).await;

    let first = wizard
        .liveness()
        .and_then(|e| e.current())
        .map(|c| c.kind)
        .expect("challenge presented");

    let outcome = wizard.step_challenge().await.expect("attempt");
    assert_eq!(outcome, Some(AttemptOutcome::NotMet(first)));
    let engine = wizard.liveness().expect("liveness stage");
    assert_eq!(engine.state(), ChallengeState::Retrying);
    assert_eq!(engine.feedback().message(), "Challenge not met. Please try again.");

    let outcome = wizard.retry_challenge().await.expect("retry");
    assert_eq!(outcome, AttemptOutcome::Passed(first));

    let engine = wizard.liveness().expect("liveness stage");
    assert_eq!(engine.completed(), [first]);
    assert_eq!(engine.state(), ChallengeState::Passed);
    assert_eq!(engine.feedback().message(), "Correct!");

    assert_eq!(
        wizard.next_challenge().expect("next"),
        ChallengeState::Presenting
    );
    let engine = wizard.liveness().expect("liveness stage");
    assert_ne!(engine.current().map(|c| c.kind), Some(first));

    while wizard.step_challenge().await.expect("attempt").is_some() {}
    let engine = wizard.liveness().expect("liveness stage");
    assert_eq!(engine.completed().len(), 3);
    assert_eq!(
        engine
            .completed()
            .iter()
            .filter(|&&kind| kind == first)
            .count(),
        1
    );
    assert_eq!(services.calls().evaluated.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn manual_attempt_beats_timer_without_double_attempt() {
    let services = Arc::new(NullServices::new());
    let mut wizard = wizard(Arc::clone(&services), Arc::new(NullCamera::available()));
    reach_liveness(&mut wizard).await;
    wizard.drain_challenge_events();

    tokio::time::sleep(Duration::from_secs(5)).await;
    wizard.attempt_challenge().await.expect("manual attempt");

    // The first timer would have fired at 12 s; only the second challenge's
    // timer may trigger an attempt now.
    tokio::time::sleep(Duration::from_secs(8)).await;
    assert_eq!(services.calls().evaluated.len(), 1);
    wizard.step_challenge().await.expect("auto attempt");
    assert_eq!(services.calls().evaluated.len(), 2);

    let started = wizard
        .drain_challenge_events()
        .into_iter()
        .filter(|e| matches!(e, ChallengeEvent::AttemptStarted { .. }))
        .count();
    assert_eq!(started, 2);
}

// ---------------------------------------------------------------------------
// 4. Navigation and reset
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn back_from_liveness_discards_progress_and_releases_camera() {
    let services = Arc::new(NullServices::new());
    let camera = Arc::new(NullCamera::available());
    let mut wizard = wizard(Arc::clone(&services), Arc::clone(&camera));
    reach_liveness(&mut wizard).await;
    wizard.step_challenge().await.expect("attempt");

    assert_eq!(wizard.go_back().await.expect("back"), Stage::LiveCapture);
    assert_eq!(camera.open_handles(), 1);

    // the abandoned engine's timer must not fire
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(services.calls().evaluated.len(), 1);

    assert!(wizard.capture_and_verify().await.expect("match"));
    wizard.advance().await.expect("advance");
    let engine = wizard.liveness().expect("liveness stage");
    assert!(engine.completed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reset_from_results_clears_everything() {
    let camera = Arc::new(NullCamera::available());
    let mut wizard = wizard(Arc::new(NullServices::new()), Arc::clone(&camera));
    reach_liveness(&mut wizard).await;
    while wizard.step_challenge().await.expect("attempt").is_some() {}
    wizard.advance().await.expect("advance");

    assert!(wizard.go_back().await.is_err());
    assert_eq!(wizard.reset(), Stage::DocumentUpload);
    assert!(wizard.record().is_empty());
    assert!(wizard.document().is_some());

    let events = wizard.drain_events();
    assert!(matches!(
        events.last(),
        Some(WizardEvent::WizardReset { from: Stage::Results })
    ));
}

#[tokio::test(start_paused = true)]
async fn document_without_face_cannot_advance() {
    let services = Arc::new(NullServices::new());
    services.push_extraction(Ok(FaceExtraction {
        success: false,
        face_image: None,
        message: "No face detected in the ID card.".into(),
    }));
    services.push_extraction(Err(ServiceError::Processing("corrupt".into())));
    let mut wizard = wizard(Arc::clone(&services), Arc::new(NullCamera::available()));

    assert!(!wizard.submit_document(document()).await.expect("answered"));
    assert!(wizard.advance().await.is_err());

    let err = wizard.submit_document(document()).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(wizard.advance().await.is_err());

    assert!(wizard.submit_document(document()).await.expect("answered"));
    assert_eq!(wizard.advance().await.expect("advance"), Stage::LiveCapture);
}

// ---------------------------------------------------------------------------
// 5. Simulated backend
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn simulated_backend_completes_with_certain_outcomes() {
    let simulation = SimulationConfig {
        challenge_pass_probability: 1.0,
        seed: Some(5),
        ..SimulationConfig::default()
    };
    let config = WizardConfig {
        simulation: simulation.clone(),
        ..WizardConfig::default()
    };
    let mut wizard = Wizard::new(
        Arc::new(SimulatedServices::new(simulation)),
        Arc::new(SimulatedCamera::new(true)),
        config,
        StdRng::seed_from_u64(5),
    );

    assert!(wizard.submit_document(document()).await.expect("extraction"));
    wizard.advance().await.expect("advance");
    assert!(wizard.capture_and_verify().await.expect("match"));
    wizard.advance().await.expect("advance");
    while wizard.step_challenge().await.expect("attempt").is_some() {}
    wizard.advance().await.expect("advance");

    let result = wizard.results().expect("results");
    assert!(result.all_passed);
    let kinds: Vec<ChallengeType> = result.liveness.iter().map(|l| l.kind).collect();
    assert_eq!(kinds.len(), 3);
}
