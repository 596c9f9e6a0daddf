//! Document upload stage: find the holder's face on an identity document.

use ekyc_services::VerificationServices;
use ekyc_types::{Image, StageOutput};
use std::sync::Arc;

use crate::error::VerificationError;

/// Shown when the service answers without finding a face and gives no reason.
pub const NO_FACE_MESSAGE: &str = "Failed to detect face.";

/// Shown when the extraction call fails.
pub const EXTRACTION_FAILURE_MESSAGE: &str =
    "An error occurred while processing the image. Please try again.";

/// Controller for [`ekyc_types::Stage::DocumentUpload`].
#[derive(Debug)]
pub struct DocumentStage<S: VerificationServices> {
    services: Arc<S>,
    document: Option<Image>,
    face: Option<Image>,
    message: Option<String>,
}

impl<S: VerificationServices> DocumentStage<S> {
    pub fn new(services: Arc<S>) -> Self {
        Self {
            services,
            document: None,
            face: None,
            message: None,
        }
    }

    /// Submit a document image and look for a face on it.
    ///
    /// Returns whether a face was found. A negative answer from the service is
    /// not an error; a failed call is, and leaves the stage incomplete.
    pub async fn submit(&mut self, document: Image) -> Result<bool, VerificationError> {
        tracing::info!(format = ?document.format(), bytes = document.len(), "document submitted");
        self.face = None;
        self.message = None;
        let result = self.services.extract_face(&document).await;
        self.document = Some(document);

        match result {
            Ok(extraction) if extraction.success => match extraction.face_image {
                Some(face) => {
                    self.face = Some(face);
                    self.message = Some(extraction.message);
                    tracing::info!("face found on document");
                    Ok(true)
                }
                None => {
                    self.message = Some(NO_FACE_MESSAGE.to_string());
                    tracing::warn!("extraction reported success without a face image");
                    Ok(false)
                }
            },
            Ok(extraction) => {
                let message = if extraction.message.is_empty() {
                    NO_FACE_MESSAGE.to_string()
                } else {
                    extraction.message
                };
                tracing::info!(message = %message, "no face found on document");
                self.message = Some(message);
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(error = %e, "face extraction failed");
                self.message = Some(EXTRACTION_FAILURE_MESSAGE.to_string());
                Err(VerificationError::ServiceCallFailed(e))
            }
        }
    }

    pub fn document(&self) -> Option<&Image> {
        self.document.as_ref()
    }

    pub fn face(&self) -> Option<&Image> {
        self.face.as_ref()
    }

    /// Inline message for the last submission.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.document.is_some() && self.face.is_some()
    }

    /// The stage output, once a face has been found.
    pub fn completion(&self) -> Option<StageOutput> {
        match (&self.document, &self.face) {
            (Some(document), Some(face)) => Some(StageOutput::Document {
                document_image: document.clone(),
                face_image: Some(face.clone()),
                face_detected: true,
            }),
            _ => None,
        }
    }

    /// Drop the current selection.
    pub fn clear(&mut self) {
        self.document = None;
        self.face = None;
        self.message = None;
    }
}
