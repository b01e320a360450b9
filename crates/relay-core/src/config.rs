//! Configuration for the orchestrator, pools and logging

use crate::error::{RelayError, RelayResult};
use crate::llm::streaming::DEFAULT_STREAM_BUFFER;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub fallback: FallbackConfig,
    pub pool: PoolConfig,
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> RelayResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(content: &str) -> RelayResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML or JSON file, chosen by extension (TOML by default)
    pub fn from_file(path: impl AsRef<Path>) -> RelayResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn validate(&self) -> RelayResult<()> {
        self.fallback.validate()
    }
}

/// Fallback orchestrator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Capacity of the per-attempt and caller stream channels
    pub stream_buffer: usize,
    /// Reject image sources larger than this many bytes
    pub max_attachment_bytes: Option<usize>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            stream_buffer: DEFAULT_STREAM_BUFFER,
            max_attachment_bytes: None,
        }
    }
}

impl FallbackConfig {
    /// Set the stream channel capacity
    pub fn with_stream_buffer(mut self, buffer: usize) -> Self {
        self.stream_buffer = buffer;
        self
    }

    /// Set the attachment size cap
    pub fn with_max_attachment_bytes(mut self, max: usize) -> Self {
        self.max_attachment_bytes = Some(max);
        self
    }

    pub fn validate(&self) -> RelayResult<()> {
        if self.stream_buffer == 0 {
            return Err(RelayError::config("stream_buffer must be greater than 0"));
        }
        Ok(())
    }
}

/// Round-robin pool settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Endpoint labels, in endpoint order (for example region names)
    pub labels: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Merge with another logging config
    pub fn merge(&mut self, other: LoggingConfig) {
        if !other.level.is_empty() {
            self.level = other.level;
        }
        if !other.format.is_empty() {
            self.format = other.format;
        }
    }
}
