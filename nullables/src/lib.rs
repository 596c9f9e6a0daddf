//! Nullable infrastructure for deterministic testing.
//!
//! The flow's external collaborators (the camera and the verification
//! backend) are abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return scripted values, in order
//! - Record every call for assertions
//! - Never sleep, touch hardware or reach the network
//!
//! Usage: swap simulated or real implementations for nullables in tests.

pub mod camera;
pub mod services;

pub use camera::NullCamera;
pub use services::NullServices;
