//! Scoped ownership of a camera device.

use ekyc_types::Image;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{Camera, CaptureError, FrameSampler, LiveFeed};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Exclusive ownership of a live camera handle for the duration of a stage.
///
/// The handle is released exactly once: by [`CaptureSession::close`], or on
/// drop if the session is still open.
pub struct CaptureSession<C: Camera> {
    id: u64,
    camera: Arc<C>,
    handle: Option<C::Handle>,
    sampler: Option<FrameSampler>,
}

impl<C: Camera> CaptureSession<C> {
    /// Acquire the camera and start the frame sampler.
    pub async fn open(camera: Arc<C>, sample_rate_hz: u32) -> Result<Self, CaptureError> {
        let handle = match camera.acquire().await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(camera = camera.name(), error = %e, "camera acquisition failed");
                return Err(e);
            }
        };
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let sampler = FrameSampler::start(id, sample_rate_hz);
        tracing::info!(session = id, camera = camera.name(), "capture session opened");
        Ok(Self {
            id,
            camera,
            handle: Some(handle),
            sampler,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Encode the current frame as a still image.
    pub fn snapshot(&self) -> Result<Image, CaptureError> {
        let handle = self.handle.as_ref().ok_or(CaptureError::SessionClosed)?;
        let image = self.camera.capture_still(handle)?;
        tracing::debug!(session = self.id, bytes = image.len(), "snapshot taken");
        Ok(image)
    }

    /// Frames sampled so far by the background sampler.
    pub fn samples_taken(&self) -> u64 {
        self.sampler.as_ref().map(FrameSampler::samples).unwrap_or(0)
    }

    /// Stop sampling and release the device. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(sampler) = self.sampler.take() {
            sampler.stop();
        }
        if let Some(handle) = self.handle.take() {
            self.camera.release(handle);
            tracing::info!(session = self.id, "capture session closed");
        }
    }
}

impl<C: Camera> LiveFeed for CaptureSession<C> {
    fn session_id(&self) -> u64 {
        self.id
    }

    fn is_open(&self) -> bool {
        CaptureSession::is_open(self)
    }

    fn snapshot(&self) -> Result<Image, CaptureError> {
        CaptureSession::snapshot(self)
    }
}

impl<C: Camera> Drop for CaptureSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Camera> std::fmt::Debug for CaptureSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("camera", &self.camera.name())
            .field("open", &self.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedCamera;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn open_snapshot_close() {
        let camera = Arc::new(SimulatedCamera::new(true));
        let mut session = CaptureSession::open(Arc::clone(&camera), 5).await.unwrap();
        assert!(session.is_open());
        assert_eq!(camera.open_devices(), 1);

        let image = session.snapshot().unwrap();
        assert!(!image.is_empty());

        session.close();
        assert!(!session.is_open());
        assert_eq!(camera.open_devices(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_idempotent() {
        let camera = Arc::new(SimulatedCamera::new(true));
        let mut session = CaptureSession::open(Arc::clone(&camera), 5).await.unwrap();
        session.close();
        session.close();
        drop(session);
        assert_eq!(camera.open_devices(), 0);
        assert_eq!(camera.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_releases_device() {
        let camera = Arc::new(SimulatedCamera::new(true));
        {
            let _session = CaptureSession::open(Arc::clone(&camera), 5).await.unwrap();
            assert_eq!(camera.open_devices(), 1);
        }
        assert_eq!(camera.open_devices(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn denied_camera_is_unavailable() {
        let camera = Arc::new(SimulatedCamera::new(false));
        let err = CaptureSession::open(Arc::clone(&camera), 5).await.unwrap_err();
        assert!(matches!(err, CaptureError::CameraUnavailable(_)));
        assert_eq!(camera.open_devices(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_after_close_fails() {
        let camera = Arc::new(SimulatedCamera::new(true));
        let mut session = CaptureSession::open(camera, 5).await.unwrap();
        session.close();
        assert_eq!(session.snapshot(), Err(CaptureError::SessionClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn sampler_runs_alongside_snapshots() {
        let camera = Arc::new(SimulatedCamera::new(true));
        let session = CaptureSession::open(camera, 5).await.unwrap();
        tokio::time::sleep(Duration::from_millis(610)).await;
        assert!(session.snapshot().is_ok());
        assert!(session.samples_taken() >= 3);
    }
}
