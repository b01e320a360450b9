//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::{RelayError, RelayResult};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Build the filter for a logging config. `RUST_LOG` wins when set.
pub fn env_filter(config: &LoggingConfig) -> RelayResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| RelayError::config(format!("invalid log level '{}': {}", config.level, e)))
}

/// Install the global tracing subscriber.
///
/// Fails if the format is unknown or a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> RelayResult<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format.as_str() {
        "json" => registry.with(fmt::layer().json()).try_init(),
        "compact" => registry.with(fmt::layer().compact()).try_init(),
        "pretty" => registry.with(fmt::layer().pretty()).try_init(),
        other => {
            return Err(RelayError::config(format!("unknown log format: {}", other)));
        }
    };

    result.map_err(|e| RelayError::config(format!("failed to install subscriber: {}", e)))
}
