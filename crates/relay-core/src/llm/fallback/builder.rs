//! Builder for fallback orchestrators

use std::sync::Arc;

use super::manager::FallbackOrchestrator;
use super::observer::ErrorObserver;
use crate::config::FallbackConfig;
use crate::error::{RelayError, RelayResult};
use crate::llm::backend::Backend;

/// Builder for [`FallbackOrchestrator`]. Backends keep the order they are added in.
#[derive(Default)]
pub struct FallbackBuilder {
    backends: Vec<Arc<dyn Backend>>,
    observer: Option<Arc<dyn ErrorObserver>>,
    config: FallbackConfig,
}

impl FallbackBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend
    pub fn backend(mut self, backend: impl Backend + 'static) -> Self {
        self.backends.push(Arc::new(backend));
        self
    }

    /// Append a shared backend
    pub fn shared_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Append several shared backends
    pub fn backends(mut self, backends: impl IntoIterator<Item = Arc<dyn Backend>>) -> Self {
        self.backends.extend(backends);
        self
    }

    /// Observe per-backend failures with a closure
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &RelayError) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(callback));
        self
    }

    /// Observe per-backend failures
    pub fn observer(mut self, observer: Arc<dyn ErrorObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(mut self, config: FallbackConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the orchestrator. Fails only on invalid configuration; an empty
    /// backend list is accepted and fails at call time.
    pub fn build(self) -> RelayResult<FallbackOrchestrator> {
        self.config.validate()?;
        Ok(FallbackOrchestrator::with_config(
            self.backends,
            self.observer,
            self.config,
        ))
    }
}
