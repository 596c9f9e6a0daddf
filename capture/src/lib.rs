//! Camera access for the verification flow.
//!
//! A [`CaptureSession`] owns one acquired camera handle exclusively and
//! releases it on every exit path: explicit [`CaptureSession::close`], or
//! drop. While open it runs a low-rate [`FrameSampler`] as a hook for
//! client-side detection.
//!
//! The device itself sits behind the [`Camera`] trait, so the flow can run
//! against a real device, the [`SimulatedCamera`], or a test double.

pub mod camera;
pub mod error;
pub mod sampler;
pub mod session;
pub mod simulated;

pub use camera::{Camera, LiveFeed};
pub use error::CaptureError;
pub use sampler::FrameSampler;
pub use session::CaptureSession;
pub use simulated::SimulatedCamera;

/// Default frame sampling rate while a session is open.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 5;
