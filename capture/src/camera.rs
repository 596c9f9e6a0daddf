//! Collaborator interfaces: the physical device and the live feed handed to
//! liveness evaluation.

use ekyc_types::Image;
use std::future::Future;

use crate::CaptureError;

/// A camera device.
///
/// Acquisition may suspend (permission prompt, device warm-up). Reading a
/// still never suspends the stream.
pub trait Camera: Send + Sync + 'static {
    /// Proof of exclusive access to the device.
    type Handle: Send + Sync + 'static;

    /// Request device access. Denial or absence fails with
    /// [`CaptureError::CameraUnavailable`].
    fn acquire(&self) -> impl Future<Output = Result<Self::Handle, CaptureError>> + Send;

    /// Read the current decoded frame and encode it as a single still.
    fn capture_still(&self, handle: &Self::Handle) -> Result<Image, CaptureError>;

    /// Give the device back.
    fn release(&self, handle: Self::Handle);

    /// Human-readable device name.
    fn name(&self) -> &str;
}

/// A live camera feed, as seen by the verification services.
pub trait LiveFeed: Send + Sync {
    fn session_id(&self) -> u64;

    fn is_open(&self) -> bool;

    /// Encode the current frame as a still image.
    fn snapshot(&self) -> Result<Image, CaptureError>;
}
