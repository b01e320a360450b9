//! Error types for Relay
//!
//! Every fallible operation in the crate returns [`RelayResult`]. The variants
//! follow the failure taxonomy of the orchestrator:
//! - per-backend generation failures, recovered locally by falling back
//! - input validation failures, raised before any backend is touched
//! - caller cancellation, surfaced immediately
//! - exhaustion, raised once every backend has failed

mod constructors;
mod conversions;
mod types;

pub use types::{RelayError, RelayResult};
