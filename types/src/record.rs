//! The verification record accumulated across stages, and the per-stage
//! outputs merged into it.

use serde::{Deserialize, Serialize};

use crate::{ChallengeType, Image, Stage};

/// Liveness outcome per challenge type, in completion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessResults {
    entries: Vec<(ChallengeType, bool)>,
}

impl LivenessResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every type mapped to `passed`, in canonical order.
    pub fn uniform(passed: bool) -> Self {
        Self {
            entries: ChallengeType::ALL.iter().map(|&t| (t, passed)).collect(),
        }
    }

    /// Record an outcome. An existing entry keeps its position and takes the new value.
    pub fn insert(&mut self, kind: ChallengeType, passed: bool) {
        match self.entries.iter_mut().find(|(t, _)| *t == kind) {
            Some(entry) => entry.1 = passed,
            None => self.entries.push((kind, passed)),
        }
    }

    pub fn get(&self, kind: ChallengeType) -> Option<bool> {
        self.entries
            .iter()
            .find(|(t, _)| *t == kind)
            .map(|(_, passed)| *passed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChallengeType, bool)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether all three types are present and passed.
    pub fn all_passed(&self) -> bool {
        ChallengeType::ALL
            .iter()
            .all(|&t| self.get(t) == Some(true))
    }
}

impl FromIterator<(ChallengeType, bool)> for LivenessResults {
    fn from_iter<I: IntoIterator<Item = (ChallengeType, bool)>>(iter: I) -> Self {
        let mut results = Self::new();
        for (kind, passed) in iter {
            results.insert(kind, passed);
        }
        results
    }
}

/// What a stage hands to the orchestrator when the user asks to proceed.
///
/// Each variant carries the stage's own completion predicate; the
/// orchestrator refuses to advance on an unsatisfied one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StageOutput {
    Document {
        document_image: Image,
        face_image: Option<Image>,
        face_detected: bool,
    },
    LiveCapture {
        live_image: Image,
        match_score: f64,
        verified: bool,
    },
    Liveness {
        results: LivenessResults,
        all_completed: bool,
    },
}

impl StageOutput {
    /// The stage that produces this output.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Document { .. } => Stage::DocumentUpload,
            Self::LiveCapture { .. } => Stage::LiveCapture,
            Self::Liveness { .. } => Stage::LivenessChallenge,
        }
    }

    /// The producing stage's completion predicate.
    pub fn is_complete(&self) -> bool {
        match self {
            Self::Document {
                face_detected,
                face_image,
                ..
            } => *face_detected && face_image.is_some(),
            Self::LiveCapture { verified, .. } => *verified,
            Self::Liveness { all_completed, .. } => *all_completed,
        }
    }
}

/// Accumulated cross-stage verification state.
///
/// Fields are only ever set by merging a stage output; nothing but
/// [`VerificationRecord::clear`] unsets them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub document_image: Option<Image>,
    pub document_face_image: Option<Image>,
    pub live_image: Option<Image>,
    pub match_score: Option<f64>,
    pub face_verified: Option<bool>,
    pub liveness_results: LivenessResults,
}

impl VerificationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow-merge a stage output. Fields the output does not carry keep
    /// their prior values.
    pub fn merge(&mut self, output: StageOutput) {
        match output {
            StageOutput::Document {
                document_image,
                face_image,
                ..
            } => {
                self.document_image = Some(document_image);
                if face_image.is_some() {
                    self.document_face_image = face_image;
                }
            }
            StageOutput::LiveCapture {
                live_image,
                match_score,
                verified,
            } => {
                self.live_image = Some(live_image);
                self.match_score = Some(match_score);
                self.face_verified = Some(verified);
            }
            StageOutput::Liveness { results, .. } => {
                if !results.is_empty() {
                    self.liveness_results = results;
                }
            }
        }
    }

    /// Drop every field (full reset).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.document_image.is_none()
            && self.document_face_image.is_none()
            && self.live_image.is_none()
            && self.match_score.is_none()
            && self.face_verified.is_none()
            && self.liveness_results.is_empty()
    }
}
