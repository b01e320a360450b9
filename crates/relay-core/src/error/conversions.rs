//! From trait implementations for RelayError conversions

use super::types::RelayError;

impl From<std::io::Error> for RelayError {
    fn from(error: std::io::Error) -> Self {
        Self::attachment(error.to_string())
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(error: toml::de::Error) -> Self {
        Self::config(error.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(error: serde_json::Error) -> Self {
        Self::config(error.to_string())
    }
}
