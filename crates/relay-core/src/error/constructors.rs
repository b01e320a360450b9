//! Constructor methods for RelayError

use super::types::RelayError;

impl RelayError {
    /// Create a new generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            model: None,
        }
    }

    /// Create a generation error tagged with the failing model
    pub fn generation_with_model(message: impl Into<String>, model: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            model: Some(model.into()),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new attachment error
    pub fn attachment(message: impl Into<String>) -> Self {
        Self::Attachment {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap the last observed failure into an exhaustion error
    pub fn exhausted(last: RelayError) -> Self {
        Self::Exhausted {
            last: Box::new(last),
        }
    }
}
