//! Error observation hook

use crate::error::RelayError;

/// Receives every per-backend failure as it happens.
///
/// Called synchronously on the orchestrating task, so implementations must
/// return quickly.
pub trait ErrorObserver: Send + Sync {
    fn on_error(&self, model: &str, error: &RelayError);
}

impl<F> ErrorObserver for F
where
    F: Fn(&str, &RelayError) + Send + Sync,
{
    fn on_error(&self, model: &str, error: &RelayError) {
        self(model, error)
    }
}
