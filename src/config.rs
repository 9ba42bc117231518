//! Configuration parsing
//!
//! Settings come from a TOML file with every section optional:
//!
//! ```toml
//! [frame]
//! fallback_width = 1920
//! fallback_height = 1080
//!
//! [transport]
//! host = "127.0.0.1"
//! port = 12500
//!
//! [calibration]
//! profile_path = "profiles/custom.json"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RigcastError;
use crate::profile::CalibrationProfile;
use crate::transport::{FRAGMENTATION_WARN_BYTES, MAX_UDP_PAYLOAD};
use crate::types::Resolution;

/// Default UDP port of the rig consumer
pub const DEFAULT_PORT: u16 = 12500;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frame: FrameConfig,
    pub transport: TransportConfig,
    pub calibration: CalibrationConfig,
}

/// Per-frame encoding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Width assumed for aspect correction when a frame has no resolution
    pub fallback_width: i32,
    /// Height assumed for aspect correction when a frame has no resolution
    pub fallback_height: i32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fallback_width: 1920,
            fallback_height: 1080,
        }
    }
}

impl FrameConfig {
    pub fn fallback_resolution(&self) -> Resolution {
        Resolution::new(self.fallback_width, self.fallback_height)
    }
}

/// UDP destination and datagram limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    /// Local address the sending socket binds to
    pub bind_address: String,
    /// Payloads above this size are dropped instead of sent
    pub max_datagram_bytes: usize,
    /// Payloads above this size log a one-time fragmentation warning
    pub warn_datagram_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            bind_address: "0.0.0.0:0".to_string(),
            max_datagram_bytes: MAX_UDP_PAYLOAD,
            warn_datagram_bytes: FRAGMENTATION_WARN_BYTES,
        }
    }
}

/// Calibration profile source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// JSON profile to load instead of the built-in one
    pub profile_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RigcastError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RigcastError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, RigcastError> {
        toml::from_str(s).map_err(|e| RigcastError::Config(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RigcastError> {
        if self.transport.host.trim().is_empty() {
            return Err(RigcastError::Config(
                "transport.host must not be empty".to_string(),
            ));
        }
        if self.transport.port == 0 {
            return Err(RigcastError::Config(
                "transport.port must be greater than 0".to_string(),
            ));
        }
        if self.transport.max_datagram_bytes == 0 {
            return Err(RigcastError::Config(
                "transport.max_datagram_bytes must be greater than 0".to_string(),
            ));
        }
        if self.transport.max_datagram_bytes > MAX_UDP_PAYLOAD {
            tracing::warn!(
                "transport.max_datagram_bytes {} exceeds the UDP limit, capping at {}",
                self.transport.max_datagram_bytes,
                MAX_UDP_PAYLOAD
            );
        }
        if self.frame.fallback_width <= 0 {
            tracing::warn!(
                "frame.fallback_width is {}; frames without a resolution will have a flat y axis",
                self.frame.fallback_width
            );
        }
        Ok(())
    }

    /// Load the configured calibration profile, or the built-in one
    pub fn load_profile(&self) -> Result<CalibrationProfile, RigcastError> {
        match &self.calibration.profile_path {
            Some(path) => {
                let profile = CalibrationProfile::from_file(path)?;
                tracing::info!(
                    "Loaded calibration profile {} from {}",
                    profile.label(),
                    path.display()
                );
                Ok(profile)
            }
            None => Ok(CalibrationProfile::builtin()),
        }
    }
}
