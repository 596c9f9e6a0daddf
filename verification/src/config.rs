//! Wizard configuration with TOML file support.

use ekyc_services::SimulationConfig;
use ekyc_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::VerificationError;

/// Configuration for a verification session.
///
/// Can be loaded from a TOML file via [`WizardConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Delay before a presented challenge is attempted automatically.
    #[serde(default = "default_auto_attempt_delay_ms")]
    pub auto_attempt_delay_ms: u64,

    /// How long "Correct!" stays on screen before the next challenge.
    #[serde(default = "default_next_challenge_delay_ms")]
    pub next_challenge_delay_ms: u64,

    /// Background frame sampling rate while a camera session is open.
    #[serde(default = "default_frame_sample_rate_hz")]
    pub frame_sample_rate_hz: u32,

    /// Whether the simulated camera grants access.
    #[serde(default = "default_true")]
    pub camera_available: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Simulated backend tunables.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_auto_attempt_delay_ms() -> u64 {
    12_000
}

fn default_next_challenge_delay_ms() -> u64 {
    1_500
}

fn default_frame_sample_rate_hz() -> u32 {
    ekyc_capture::DEFAULT_SAMPLE_RATE_HZ
}

fn default_true() -> bool {
    true
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl WizardConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, VerificationError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| VerificationError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, VerificationError> {
        let config: Self =
            toml::from_str(s).map_err(|e| VerificationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, VerificationError> {
        toml::to_string_pretty(self).map_err(|e| VerificationError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), VerificationError> {
        if self.frame_sample_rate_hz == 0 {
            return Err(VerificationError::Config(
                "frame_sample_rate_hz must be positive".to_string(),
            ));
        }
        if self.auto_attempt_delay_ms == 0 {
            return Err(VerificationError::Config(
                "auto_attempt_delay_ms must be positive".to_string(),
            ));
        }
        self.simulation.validate().map_err(VerificationError::Config)
    }

    pub fn auto_attempt_delay(&self) -> Duration {
        Duration::from_millis(self.auto_attempt_delay_ms)
    }

    pub fn next_challenge_delay(&self) -> Duration {
        Duration::from_millis(self.next_challenge_delay_ms)
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            auto_attempt_delay_ms: default_auto_attempt_delay_ms(),
            next_challenge_delay_ms: default_next_challenge_delay_ms(),
            frame_sample_rate_hz: default_frame_sample_rate_hz(),
            camera_available: default_true(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            simulation: SimulationConfig::default(),
        }
    }
}
