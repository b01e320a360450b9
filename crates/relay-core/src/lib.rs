//! Relay Core Library
//!
//! One generation interface over several interchangeable backends:
//! ordered fallback for one-shot, image, chat and streamed calls, and a
//! round-robin pool for spreading load across equivalent endpoints.

pub mod config;
pub mod error;
pub mod llm;
pub mod logging;

pub use config::{FallbackConfig, LoggingConfig, PoolConfig, RelayConfig};
pub use error::{RelayError, RelayResult};
pub use llm::{
    Backend, ErrorObserver, FallbackBuilder, FallbackOrchestrator, Message, MimeType, Role,
    RoundRobinPool, StreamEvent,
};
