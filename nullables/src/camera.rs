//! Nullable camera: availability you can flip, and counters you can assert on.

use ekyc_capture::{Camera, CaptureError};
use ekyc_types::{Image, ImageFormat};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// A camera for tests.
///
/// Acquisition completes immediately. Stills are tagged with a running frame
/// number so successive snapshots differ.
#[derive(Debug)]
pub struct NullCamera {
    available: AtomicBool,
    acquired: AtomicUsize,
    released: AtomicUsize,
    frames: AtomicU64,
}

#[derive(Debug)]
pub struct NullHandle {
    pub slot: usize,
}

impl NullCamera {
    pub fn available() -> Self {
        Self::with_availability(true)
    }

    /// A camera whose permission prompt is always denied.
    pub fn denied() -> Self {
        Self::with_availability(false)
    }

    fn with_availability(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            frames: AtomicU64::new(0),
        }
    }

    /// Grant or revoke access for later acquisitions.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Successful acquisitions so far.
    pub fn acquisitions(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Handles currently outstanding.
    pub fn open_handles(&self) -> usize {
        self.acquisitions() - self.releases()
    }

    /// Stills captured so far.
    pub fn stills(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

impl Camera for NullCamera {
    type Handle = NullHandle;

    async fn acquire(&self) -> Result<NullHandle, CaptureError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(CaptureError::CameraUnavailable(
                "null camera denied".to_string(),
            ));
        }
        let slot = self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(NullHandle { slot })
    }

    fn capture_still(&self, handle: &NullHandle) -> Result<Image, CaptureError> {
        let frame = self.frames.fetch_add(1, Ordering::SeqCst);
        let mut bytes = vec![handle.slot as u8];
        bytes.extend_from_slice(&frame.to_be_bytes());
        Image::new(ImageFormat::Jpeg, bytes).map_err(|e| CaptureError::Encoding(e.to_string()))
    }

    fn release(&self, _handle: NullHandle) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn denied_until_granted() {
        let camera = NullCamera::denied();
        assert!(camera.acquire().await.is_err());
        camera.set_available(true);
        let handle = camera.acquire().await.unwrap();
        assert_eq!(camera.open_handles(), 1);
        camera.release(handle);
        assert_eq!(camera.open_handles(), 0);
    }

    #[tokio::test]
    async fn stills_differ_per_frame() {
        let camera = NullCamera::available();
        let handle = camera.acquire().await.unwrap();
        let a = camera.capture_still(&handle).unwrap();
        let b = camera.capture_still(&handle).unwrap();
        assert_ne!(a, b);
        assert_eq!(camera.stills(), 2);
    }
}
