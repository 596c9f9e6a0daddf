//! Encoded still images passed between the camera, the services and the summary.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Container format of an encoded still image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Bmp,
}

impl ImageFormat {
    /// MIME type used when the image is rendered as a data URL.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Bmp => "image/bmp",
        }
    }

    /// Resolve a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Result<Self, TypesError> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "bmp" => Ok(Self::Bmp),
            other => Err(TypesError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// An encoded still image.
///
/// The bytes are opaque to the flow: encoding and decoding belong to the
/// camera and to the verification services.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl Image {
    pub fn new(format: ImageFormat, bytes: Vec<u8>) -> Result<Self, TypesError> {
        if bytes.is_empty() {
            return Err(TypesError::EmptyImage);
        }
        Ok(Self { format, bytes })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Render as a `data:` URL for the presentation layer.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime(), STANDARD.encode(&self.bytes))
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}
