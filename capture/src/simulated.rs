//! A camera that needs no hardware, for demos and local runs.

use ekyc_types::{Image, ImageFormat};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::{Camera, CaptureError};

/// Simulated device producing placeholder JPEG stills.
///
/// Availability is fixed at construction; an unavailable camera behaves like
/// a denied permission prompt.
#[derive(Debug)]
pub struct SimulatedCamera {
    available: bool,
    acquire_latency: Duration,
    open: AtomicUsize,
    releases: AtomicUsize,
    frames: AtomicU64,
}

#[derive(Debug)]
pub struct SimulatedHandle {
    device: u64,
}

impl SimulatedCamera {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            acquire_latency: Duration::from_millis(50),
            open: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            frames: AtomicU64::new(0),
        }
    }

    /// Handles currently held.
    pub fn open_devices(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Total releases so far.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Camera for SimulatedCamera {
    type Handle = SimulatedHandle;

    async fn acquire(&self) -> Result<SimulatedHandle, CaptureError> {
        tokio::time::sleep(self.acquire_latency).await;
        if !self.available {
            return Err(CaptureError::CameraUnavailable(
                "permission denied by user".to_string(),
            ));
        }
        let device = self.open.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(SimulatedHandle { device })
    }

    fn capture_still(&self, handle: &SimulatedHandle) -> Result<Image, CaptureError> {
        let frame = self.frames.fetch_add(1, Ordering::Relaxed);
        // SOI + APP0 marker, a frame tag, then EOI.
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend_from_slice(&handle.device.to_be_bytes());
        bytes.extend_from_slice(&frame.to_be_bytes());
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        Image::new(ImageFormat::Jpeg, bytes).map_err(|e| CaptureError::Encoding(e.to_string()))
    }

    fn release(&self, _handle: SimulatedHandle) {
        self.open.fetch_sub(1, Ordering::SeqCst);
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
