//! Platform configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use vpcm_core::{VoiceError, VoiceResult};

/// Voice platform configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Ask the service to destroy its voice context when a call ends
    pub destroy_cvd: bool,
    /// Ask the service to vote for the battery monitor during calls
    pub vote_bms: bool,
    /// Events each capture path queue holds before refusing more
    pub detection_queue_depth: usize,
    /// Log filter directive, used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        PlatformConfig {
            destroy_cvd: false,
            vote_bms: false,
            detection_queue_depth: 32,
            log_filter: "info".to_string(),
            json_logs: false,
        }
    }
}

impl PlatformConfig {
    /// Verbose logging and deeper queues for bring-up
    pub fn diagnostics() -> Self {
        PlatformConfig {
            detection_queue_depth: 256,
            log_filter: "vpcm=debug,info".to_string(),
            ..Default::default()
        }
    }

    /// Tear the voice context down after every call and keep the battery
    /// monitor voted, for devices that need both
    pub fn low_power() -> Self {
        PlatformConfig {
            destroy_cvd: true,
            vote_bms: true,
            detection_queue_depth: 8,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> VoiceResult<Self> {
        let config: PlatformConfig = serde_json::from_str(json)
            .map_err(|e| VoiceError::Config(format!("invalid platform config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> VoiceResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| VoiceError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> VoiceResult<()> {
        if self.detection_queue_depth == 0 {
            return Err(VoiceError::Config(
                "detection_queue_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
