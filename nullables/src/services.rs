//! Nullable verification backend: scripted answers, recorded calls.

use ekyc_capture::LiveFeed;
use ekyc_services::{FaceExtraction, FaceMatch, ServiceError, VerificationServices};
use ekyc_types::{Challenge, ChallengeType, Image, ImageFormat};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A verification backend for tests.
///
/// Each operation pops the next scripted answer from its own queue. When a
/// queue is empty the answer is the happy path: a face is found, the match
/// scores 80 and is verified, every challenge passes.
#[derive(Debug, Default)]
pub struct NullServices {
    extractions: Mutex<VecDeque<Result<FaceExtraction, ServiceError>>>,
    matches: Mutex<VecDeque<Result<FaceMatch, ServiceError>>>,
    challenges: Mutex<VecDeque<Result<bool, ServiceError>>>,
    calls: Mutex<Calls>,
}

/// Every call received, for assertions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Calls {
    pub extract_face: usize,
    pub match_face: usize,
    pub evaluated: Vec<ChallengeType>,
}

impl NullServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn face_image() -> Image {
        Image::new(ImageFormat::Png, vec![0x89, b'P', b'N', b'G'])
            .expect("non-empty placeholder")
    }

    pub fn found_face() -> FaceExtraction {
        FaceExtraction {
            success: true,
            face_image: Some(Self::face_image()),
            message: "Face detected successfully.".to_string(),
        }
    }

    pub fn matched(score: f64, verified: bool) -> FaceMatch {
        FaceMatch {
            success: true,
            score,
            verified,
            message: if verified {
                "Verification successful!".to_string()
            } else {
                "Verification failed.".to_string()
            },
        }
    }

    pub fn push_extraction(&self, answer: Result<FaceExtraction, ServiceError>) {
        lock(&self.extractions).push_back(answer);
    }

    pub fn push_match(&self, answer: Result<FaceMatch, ServiceError>) {
        lock(&self.matches).push_back(answer);
    }

    /// Queue challenge outcomes, consumed one per evaluation.
    pub fn push_challenges(&self, answers: impl IntoIterator<Item = Result<bool, ServiceError>>) {
        lock(&self.challenges).extend(answers);
    }

    pub fn calls(&self) -> Calls {
        lock(&self.calls).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl VerificationServices for NullServices {
    async fn extract_face(&self, _document: &Image) -> Result<FaceExtraction, ServiceError> {
        lock(&self.calls).extract_face += 1;
        lock(&self.extractions)
            .pop_front()
            .unwrap_or_else(|| Ok(Self::found_face()))
    }

    async fn match_face(&self, _live: &Image) -> Result<FaceMatch, ServiceError> {
        lock(&self.calls).match_face += 1;
        lock(&self.matches)
            .pop_front()
            .unwrap_or_else(|| Ok(Self::matched(80.0, true)))
    }

    async fn evaluate_challenge(
        &self,
        challenge: &Challenge,
        feed: &dyn LiveFeed,
    ) -> Result<bool, ServiceError> {
        lock(&self.calls).evaluated.push(challenge.kind);
        if !feed.is_open() {
            return Err(ServiceError::InvalidInput("live feed is closed".to_string()));
        }
        lock(&self.challenges).pop_front().unwrap_or(Ok(true))
    }

    fn name(&self) -> &str {
        "null"
    }
}
