//! Ordered backend fallback
//!
//! [`FallbackOrchestrator`] tries its backends in priority order and returns
//! the first success. Streaming calls fail over mid-stream and emit a
//! [`StreamEvent::Clear`](crate::llm::StreamEvent::Clear) before the next
//! backend's tokens so consumers can drop the partial output.

mod builder;
mod manager;
mod observer;
mod operations;
mod streaming;

#[cfg(test)]
mod tests;

pub use builder::FallbackBuilder;
pub use manager::FallbackOrchestrator;
pub use observer::ErrorObserver;
