//! Verification services consumed by the flow.
//!
//! The biometric work (finding a face on a document, matching a live face,
//! judging a liveness challenge) is remote and opaque. The flow only sees the
//! [`VerificationServices`] trait; the backend behind it is pluggable.
//! [`SimulatedServices`] stands in for a real backend in demos.

pub mod error;
pub mod simulated;

pub use error::ServiceError;
pub use simulated::{SimulatedServices, SimulationConfig};

use ekyc_capture::LiveFeed;
use ekyc_types::{Challenge, Image};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Result of looking for a face on an identity document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceExtraction {
    pub success: bool,
    pub face_image: Option<Image>,
    pub message: String,
}

/// Result of matching a live capture against the document face.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub success: bool,
    /// Similarity in `0..=100`.
    pub score: f64,
    pub verified: bool,
    pub message: String,
}

/// The remote verification backend.
///
/// Calls may take arbitrarily long and may fail; there is no timeout at this
/// boundary.
pub trait VerificationServices: Send + Sync + 'static {
    /// Locate the holder's face on a document image.
    fn extract_face(
        &self,
        document: &Image,
    ) -> impl Future<Output = Result<FaceExtraction, ServiceError>> + Send;

    /// Match a live still against the document face.
    fn match_face(&self, live: &Image)
        -> impl Future<Output = Result<FaceMatch, ServiceError>> + Send;

    /// Judge whether the user performed `challenge` on the live feed.
    ///
    /// `Ok(false)` is an expected negative outcome, not a fault.
    fn evaluate_challenge(
        &self,
        challenge: &Challenge,
        feed: &dyn LiveFeed,
    ) -> impl Future<Output = Result<bool, ServiceError>> + Send;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}
