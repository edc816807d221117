//! Runtime configuration for the recording engine.
//!
//! [`RecorderConfig`] is loaded from `reel.toml` (or built from defaults)
//! and controls where recordings land, the capture limits, and how the
//! browser is launched. The headless toggle changes only how Chrome is
//! spawned -- it never affects the recorded log schema.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RecorderError;

/// Per-session event ceiling. Recording stops with a capacity signal when
/// the log reaches this many events.
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

/// Largest serialized recording the store will write (50 MB).
pub const DEFAULT_MAX_SAVE_BYTES: u64 = 50 * 1024 * 1024;

/// Largest recording file the store will read back (10 MB).
pub const DEFAULT_MAX_LOAD_BYTES: u64 = 10 * 1024 * 1024;

/// How long launch + attach may take before failing the session.
pub const DEFAULT_LAUNCH_TIMEOUT_SECS: u64 = 15;

/// Top-level configuration for a Reel instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Directory recordings are written to.
    pub recordings_dir: PathBuf,

    /// Launch Chrome without a visible window.
    #[serde(default)]
    pub headless: bool,

    /// Per-session event ceiling.
    #[serde(default = "default_max_events")]
    pub max_events: usize,

    /// Serialized-recording write ceiling in bytes.
    #[serde(default = "default_max_save_bytes")]
    pub max_save_bytes: u64,

    /// Recording-file read ceiling in bytes.
    #[serde(default = "default_max_load_bytes")]
    pub max_load_bytes: u64,

    /// Seconds allowed for browser launch + DevTools attach.
    #[serde(default = "default_launch_timeout_secs")]
    pub launch_timeout_secs: u64,

    /// Explicit browser binary path; overrides discovery when set.
    #[serde(default)]
    pub browser_binary: Option<String>,

    /// Extra arguments appended to the Chrome command line.
    #[serde(default)]
    pub extra_browser_args: Vec<String>,
}

fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS
}

fn default_max_save_bytes() -> u64 {
    DEFAULT_MAX_SAVE_BYTES
}

fn default_max_load_bytes() -> u64 {
    DEFAULT_MAX_LOAD_BYTES
}

fn default_launch_timeout_secs() -> u64 {
    DEFAULT_LAUNCH_TIMEOUT_SECS
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            recordings_dir: PathBuf::from("recordings"),
            headless: false,
            max_events: DEFAULT_MAX_EVENTS,
            max_save_bytes: DEFAULT_MAX_SAVE_BYTES,
            max_load_bytes: DEFAULT_MAX_LOAD_BYTES,
            launch_timeout_secs: DEFAULT_LAUNCH_TIMEOUT_SECS,
            browser_binary: None,
            extra_browser_args: Vec::new(),
        }
    }
}

impl RecorderConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, RecorderError> {
        toml::from_str(content).map_err(|e| RecorderError::Validation {
            reason: format!("invalid configuration: {e}"),
        })
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, RecorderError> {
        toml::to_string_pretty(self).map_err(|e| RecorderError::Validation {
            reason: format!("configuration not serializable: {e}"),
        })
    }

    /// Launch + attach deadline as a [`Duration`].
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }

    /// Apply environment overrides: `REEL_HEADLESS` (1/true/yes) and
    /// `REEL_RECORDINGS_DIR`. The browser binary override
    /// (`REEL_BROWSER_BIN`) is consumed where discovery runs.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("REEL_HEADLESS") {
            self.headless = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(dir) = std::env::var("REEL_RECORDINGS_DIR") {
            if !dir.trim().is_empty() {
                self.recordings_dir = PathBuf::from(dir);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_design_limits() {
        let config = RecorderConfig::default();
        assert_eq!(config.max_events, 10_000);
        assert_eq!(config.max_save_bytes, 50 * 1024 * 1024);
        assert_eq!(config.max_load_bytes, 10 * 1024 * 1024);
        assert!(!config.headless);
    }

    #[test]
    fn toml_roundtrip() {
        let config = RecorderConfig {
            recordings_dir: PathBuf::from("/tmp/recordings"),
            headless: true,
            browser_binary: Some("/usr/bin/chromium".into()),
            ..Default::default()
        };
        let toml_str = config.to_toml().unwrap();
        let parsed = RecorderConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.recordings_dir, PathBuf::from("/tmp/recordings"));
        assert!(parsed.headless);
        assert_eq!(parsed.browser_binary.as_deref(), Some("/usr/bin/chromium"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed = RecorderConfig::from_toml("recordings_dir = \"out\"\n").unwrap();
        assert_eq!(parsed.recordings_dir, PathBuf::from("out"));
        assert_eq!(parsed.max_events, DEFAULT_MAX_EVENTS);
        assert_eq!(parsed.launch_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn invalid_toml_is_a_validation_error() {
        let err = RecorderConfig::from_toml("recordings_dir = [").unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn env_overrides_headless_and_dir() {
        let mut config = RecorderConfig::default();
        std::env::set_var("REEL_HEADLESS", "true");
        std::env::set_var("REEL_RECORDINGS_DIR", "/tmp/reel-env-test");
        config.apply_env();
        std::env::remove_var("REEL_HEADLESS");
        std::env::remove_var("REEL_RECORDINGS_DIR");
        assert!(config.headless);
        assert_eq!(config.recordings_dir, PathBuf::from("/tmp/reel-env-test"));
    }
}
