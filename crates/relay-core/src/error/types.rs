//! Core error type for Relay

use thiserror::Error;

/// Result type alias for Relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Main error type for Relay
///
/// Errors are `Clone` so the orchestrator can hand one to the error observer
/// and still keep it as the last error of the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// A backend failed to generate a response
    #[error("Generation error: {message}")]
    Generation {
        message: String,
        model: Option<String>,
    },

    /// The request was rejected before any backend was attempted
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A round-robin pool was built without endpoints
    #[error("Pool requires at least one endpoint")]
    EmptyPool,

    /// The orchestrator has no backends to try
    #[error("no backends configured")]
    NoBackends,

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// Every backend failed; only the last failure is retained
    #[error("all backends failed, last error: {last}")]
    Exhausted { last: Box<RelayError> },

    /// Every backend failed without reporting a usable error
    #[error("all backends failed")]
    AllBackendsFailed,

    /// A backend stream closed without a terminal event
    #[error("stream from {model} ended without completion")]
    StreamInterrupted { model: String },

    /// Reading an image source failed
    #[error("Attachment error: {message}")]
    Attachment { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl RelayError {
    /// Whether this error represents caller cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error was raised by input validation
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::Attachment { .. })
    }

    /// The wrapped last error of an exhaustion failure
    pub fn last_error(&self) -> Option<&RelayError> {
        match self {
            Self::Exhausted { last } => Some(last),
            _ => None,
        }
    }

    /// Model identifier attached to a generation error, if any
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Generation { model, .. } => model.as_deref(),
            Self::StreamInterrupted { model } => Some(model),
            _ => None,
        }
    }
}
