//! Live capture stage: match a live still against the document face.

use ekyc_capture::{Camera, CaptureSession};
use ekyc_services::VerificationServices;
use ekyc_types::{Image, StageOutput};
use std::sync::Arc;

use crate::error::VerificationError;

pub const CAMERA_UNAVAILABLE_MESSAGE: &str =
    "Could not access camera. Please check permissions and try again.";

pub const MATCH_FAILURE_MESSAGE: &str = "An error occurred during verification.";

/// Last match answer kept by the stage.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveMatch {
    pub live_image: Image,
    pub score: f64,
    pub verified: bool,
}

/// Controller for [`ekyc_types::Stage::LiveCapture`].
///
/// Holds the capture session while active. Captures may be repeated until one
/// is verified.
pub struct LiveCaptureStage<S: VerificationServices, C: Camera> {
    services: Arc<S>,
    session: Option<CaptureSession<C>>,
    last: Option<LiveMatch>,
    message: Option<String>,
    camera_blocked: bool,
}

impl<S: VerificationServices, C: Camera> LiveCaptureStage<S, C> {
    pub fn new(services: Arc<S>) -> Self {
        Self {
            services,
            session: None,
            last: None,
            message: None,
            camera_blocked: false,
        }
    }

    /// Acquire the camera. Denial blocks the stage until the camera is
    /// opened successfully; the user can still go back.
    pub async fn open_camera(
        &mut self,
        camera: Arc<C>,
        sample_rate_hz: u32,
    ) -> Result<(), VerificationError> {
        self.close();
        match CaptureSession::open(camera, sample_rate_hz).await {
            Ok(session) => {
                self.session = Some(session);
                self.camera_blocked = false;
                self.message = None;
                Ok(())
            }
            Err(e) => {
                self.camera_blocked = true;
                self.message = Some(CAMERA_UNAVAILABLE_MESSAGE.to_string());
                Err(e.into())
            }
        }
    }

    /// Snapshot the live feed and match it against the document face.
    ///
    /// Returns whether the capture was verified.
    pub async fn capture_and_verify(&mut self) -> Result<bool, VerificationError> {
        if self.is_complete() {
            return Err(VerificationError::InvalidTransition {
                stage: ekyc_types::Stage::LiveCapture,
                action: "capture after verification",
            });
        }
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| VerificationError::CameraUnavailable("camera is not open".to_string()))?;
        let live_image = session.snapshot()?;
        self.message = None;

        match self.services.match_face(&live_image).await {
            Ok(answer) if answer.success => {
                tracing::info!(score = answer.score, verified = answer.verified, "face match answered");
                self.message = Some(answer.message);
                self.last = Some(LiveMatch {
                    live_image,
                    score: answer.score,
                    verified: answer.verified,
                });
                Ok(answer.verified)
            }
            Ok(answer) => {
                tracing::info!(message = %answer.message, "face match unsuccessful");
                self.message = Some(answer.message);
                self.last = None;
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(error = %e, "face match failed");
                self.message = Some(MATCH_FAILURE_MESSAGE.to_string());
                self.last = None;
                Err(VerificationError::ServiceCallFailed(e))
            }
        }
    }

    pub fn last_match(&self) -> Option<&LiveMatch> {
        self.last.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Whether the camera was denied on the last open.
    pub fn camera_blocked(&self) -> bool {
        self.camera_blocked
    }

    pub fn has_live_session(&self) -> bool {
        self.session.as_ref().is_some_and(CaptureSession::is_open)
    }

    pub fn is_complete(&self) -> bool {
        self.last.as_ref().is_some_and(|m| m.verified)
    }

    /// The stage output, once a capture has been verified.
    pub fn completion(&self) -> Option<StageOutput> {
        self.last
            .as_ref()
            .filter(|m| m.verified)
            .map(|m| StageOutput::LiveCapture {
                live_image: m.live_image.clone(),
                match_score: m.score,
                verified: true,
            })
    }

    /// Release the camera. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }
}

impl<S: VerificationServices, C: Camera> Drop for LiveCaptureStage<S, C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: VerificationServices, C: Camera> std::fmt::Debug for LiveCaptureStage<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveCaptureStage")
            .field("session", &self.session)
            .field("last", &self.last)
            .field("camera_blocked", &self.camera_blocked)
            .finish()
    }
}
