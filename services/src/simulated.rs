//! Simulated verification backend.
//!
//! Outcomes are random within configured bounds and delivered after a fixed
//! latency, mimicking a remote call. All randomness of the flow's outcomes
//! lives here, never in the flow itself.

use ekyc_capture::LiveFeed;
use ekyc_types::{Challenge, Image, ImageFormat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

use crate::{FaceExtraction, FaceMatch, ServiceError, VerificationServices};

/// Tunables for [`SimulatedServices`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Whether a face is found on every document.
    #[serde(default = "default_true")]
    pub face_found: bool,

    #[serde(default = "default_extract_latency_ms")]
    pub extract_latency_ms: u64,

    #[serde(default = "default_match_latency_ms")]
    pub match_latency_ms: u64,

    #[serde(default = "default_challenge_latency_ms")]
    pub challenge_latency_ms: u64,

    /// Lower bound of the simulated match score (inclusive).
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// Upper bound of the simulated match score (exclusive).
    #[serde(default = "default_max_score")]
    pub max_score: f64,

    /// Scores at or above this are verified.
    #[serde(default = "default_verify_threshold")]
    pub verify_threshold: f64,

    /// Probability that one challenge attempt passes.
    #[serde(default = "default_pass_probability")]
    pub challenge_pass_probability: f64,

    /// Seed for reproducible outcomes; entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_extract_latency_ms() -> u64 {
    1_500
}

fn default_match_latency_ms() -> u64 {
    2_000
}

fn default_challenge_latency_ms() -> u64 {
    2_000
}

fn default_min_score() -> f64 {
    50.0
}

fn default_max_score() -> f64 {
    100.0
}

fn default_verify_threshold() -> f64 {
    50.0
}

fn default_pass_probability() -> f64 {
    0.7
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            face_found: default_true(),
            extract_latency_ms: default_extract_latency_ms(),
            match_latency_ms: default_match_latency_ms(),
            challenge_latency_ms: default_challenge_latency_ms(),
            min_score: default_min_score(),
            max_score: default_max_score(),
            verify_threshold: default_verify_threshold(),
            challenge_pass_probability: default_pass_probability(),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Check that the configured ranges make sense.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.min_score)
            || !(0.0..=100.0).contains(&self.max_score)
            || self.min_score >= self.max_score
        {
            return Err(format!(
                "score range {}..{} must be a non-empty range within 0..100",
                self.min_score, self.max_score
            ));
        }
        if !(0.0..=1.0).contains(&self.challenge_pass_probability) {
            return Err(format!(
                "challenge_pass_probability {} must be within 0..1",
                self.challenge_pass_probability
            ));
        }
        Ok(())
    }
}

/// 1x1 PNG used as the "detected face" crop.
const PLACEHOLDER_FACE_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x60, 0x60, 0xF8, 0xFF,
    0x1F, 0x00, 0x04, 0x03, 0x02, 0x00, 0x6B, 0x8E, 0x8B, 0x4B, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45,
    0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// A backend that answers with random outcomes after a fixed delay.
#[derive(Debug)]
pub struct SimulatedServices {
    config: SimulationConfig,
    rng: Mutex<StdRng>,
}

impl SimulatedServices {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn draw<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }
}

impl Default for SimulatedServices {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl VerificationServices for SimulatedServices {
    async fn extract_face(&self, document: &Image) -> Result<FaceExtraction, ServiceError> {
        tokio::time::sleep(Duration::from_millis(self.config.extract_latency_ms)).await;
        tracing::debug!(bytes = document.len(), "simulated face extraction");

        if !self.config.face_found {
            return Ok(FaceExtraction {
                success: false,
                face_image: None,
                message: "No face detected in the ID card.".to_string(),
            });
        }

        let face = Image::new(ImageFormat::Png, PLACEHOLDER_FACE_PNG.to_vec())
            .map_err(|e| ServiceError::Processing(e.to_string()))?;
        Ok(FaceExtraction {
            success: true,
            face_image: Some(face),
            message: "Face detected successfully.".to_string(),
        })
    }

    async fn match_face(&self, live: &Image) -> Result<FaceMatch, ServiceError> {
        tokio::time::sleep(Duration::from_millis(self.config.match_latency_ms)).await;

        let (min, max) = (self.config.min_score, self.config.max_score);
        if min >= max {
            return Err(ServiceError::Processing(format!(
                "empty score range {min}..{max}"
            )));
        }
        let score = self.draw(|rng| rng.gen_range(min..max));
        let verified = score >= self.config.verify_threshold;
        tracing::debug!(bytes = live.len(), score, verified, "simulated face match");

        Ok(FaceMatch {
            success: true,
            score,
            verified,
            message: if verified {
                "Verification successful!".to_string()
            } else {
                "Verification failed.".to_string()
            },
        })
    }

    async fn evaluate_challenge(
        &self,
        challenge: &Challenge,
        feed: &dyn LiveFeed,
    ) -> Result<bool, ServiceError> {
        if !feed.is_open() {
            return Err(ServiceError::InvalidInput("live feed is closed".to_string()));
        }
        feed.snapshot()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        tokio::time::sleep(Duration::from_millis(self.config.challenge_latency_ms)).await;

        let p = self.config.challenge_pass_probability.clamp(0.0, 1.0);
        let passed = self.draw(|rng| rng.gen_bool(p));
        tracing::debug!(
            session = feed.session_id(),
            challenge = %challenge.kind,
            passed,
            "simulated challenge evaluation"
        );
        Ok(passed)
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekyc_capture::{CaptureSession, SimulatedCamera};
    use ekyc_types::ChallengeType;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    fn document() -> Image {
        Image::new(ImageFormat::Jpeg, vec![0xFF, 0xD8, 0xFF, 0xD9]).unwrap()
    }

    fn seeded(config: SimulationConfig) -> SimulatedServices {
        SimulatedServices::new(SimulationConfig {
            seed: Some(42),
            ..config
        })
    }

    #[tokio::test(start_paused = true)]
    async fn extraction_finds_face_by_default() {
        let services = seeded(SimulationConfig::default());
        let result = services.extract_face(&document()).await.unwrap();
        assert!(result.success);
        assert!(result.face_image.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn extraction_without_face_reports_message() {
        let services = seeded(SimulationConfig {
            face_found: false,
            ..SimulationConfig::default()
        });
        let result = services.extract_face(&document()).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.face_image, None);
        assert_eq!(result.message, "No face detected in the ID card.");
    }

    #[tokio::test(start_paused = true)]
    async fn match_scores_stay_in_range_and_respect_threshold() {
        let services = seeded(SimulationConfig {
            verify_threshold: 75.0,
            ..SimulationConfig::default()
        });
        for _ in 0..50 {
            let result = services.match_face(&document()).await.unwrap();
            assert!((50.0..100.0).contains(&result.score));
            assert_eq!(result.verified, result.score >= 75.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn certain_pass_probability_always_passes() {
        let services = seeded(SimulationConfig {
            challenge_pass_probability: 1.0,
            ..SimulationConfig::default()
        });
        let camera = Arc::new(SimulatedCamera::new(true));
        let session = CaptureSession::open(camera, 0).await.unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for kind in ChallengeType::ALL {
            let challenge = Challenge::random(kind, &mut rng);
            assert!(services.evaluate_challenge(&challenge, &session).await.unwrap());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closed_feed_is_rejected() {
        let services = seeded(SimulationConfig::default());
        let camera = Arc::new(SimulatedCamera::new(true));
        let mut session = CaptureSession::open(camera, 0).await.unwrap();
        session.close();
        let mut rng = StdRng::seed_from_u64(1);
        let challenge = Challenge::random(ChallengeType::Blink, &mut rng);
        let err = services
            .evaluate_challenge(&challenge, &session)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let inverted = SimulationConfig {
            min_score: 90.0,
            max_score: 10.0,
            ..SimulationConfig::default()
        };
        assert!(inverted.validate().is_err());

        let probability = SimulationConfig {
            challenge_pass_probability: 1.5,
            ..SimulationConfig::default()
        };
        assert!(probability.validate().is_err());
        assert!(SimulationConfig::default().validate().is_ok());
    }
}
