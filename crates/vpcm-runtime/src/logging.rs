//! Logging setup

use tracing_subscriber::{fmt, EnvFilter};
use vpcm_core::{VoiceError, VoiceResult};

use crate::PlatformConfig;

/// Build the log filter: `RUST_LOG` wins, otherwise the configured directive
pub fn log_filter(config: &PlatformConfig) -> VoiceResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_filter).map_err(|e| {
            VoiceError::Config(format!("invalid log filter {:?}: {}", config.log_filter, e))
        }),
    }
}

/// Install the global subscriber.
///
/// Returns false when a subscriber was already installed; that one stays.
pub fn init_logging(config: &PlatformConfig) -> VoiceResult<bool> {
    let filter = log_filter(config)?;
    let builder = fmt::Subscriber::builder().with_env_filter(filter);

    let installed = if config.json_logs {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(json = config.json_logs, "logging initialized");
    }
    Ok(installed)
}
