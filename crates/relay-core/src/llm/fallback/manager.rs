//! Fallback orchestrator state and the shared attempt loop

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::observer::ErrorObserver;
use crate::config::FallbackConfig;
use crate::error::{RelayError, RelayResult};
use crate::llm::backend::Backend;

/// Tries an ordered list of backends until one succeeds.
///
/// Insertion order is priority order. The list is fixed at construction.
pub struct FallbackOrchestrator {
    pub(super) backends: Vec<Arc<dyn Backend>>,
    /// Model of the backend that succeeded last. Not request scoped: with
    /// concurrent calls it holds whichever success wrote last.
    current_model: RwLock<String>,
    observer: Option<Arc<dyn ErrorObserver>>,
    pub(super) config: FallbackConfig,
}

impl FallbackOrchestrator {
    /// Create an orchestrator with default configuration
    pub fn new(backends: Vec<Arc<dyn Backend>>, observer: Option<Arc<dyn ErrorObserver>>) -> Self {
        Self::with_config(backends, observer, FallbackConfig::default())
    }

    /// Create an orchestrator with explicit configuration
    pub fn with_config(
        backends: Vec<Arc<dyn Backend>>,
        observer: Option<Arc<dyn ErrorObserver>>,
        config: FallbackConfig,
    ) -> Self {
        Self {
            backends,
            current_model: RwLock::new(String::new()),
            observer,
            config,
        }
    }

    /// Number of backends
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Current model identifiers of all backends, in priority order
    pub fn models(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.model()).collect()
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Model of the backend that succeeded last, empty before any success
    pub fn current_model(&self) -> String {
        self.current_model.read().clone()
    }

    pub(super) fn record_success(&self, model: String) {
        *self.current_model.write() = model;
    }

    /// Report a per-backend failure to the log and the observer
    pub(super) fn report_failure(&self, attempt: usize, model: &str, error: &RelayError) {
        warn!(attempt, model = %model, error = %error, "Model {} error: {}", model, error);
        if let Some(observer) = &self.observer {
            observer.on_error(model, error);
        }
    }

    /// Run `call` against each backend in order until one succeeds.
    ///
    /// One-shot calls carry no caller cancellation scope, so every error,
    /// `Cancelled` included, is a per-backend failure.
    pub(super) async fn run_with_fallback<F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> RelayResult<String>
    where
        F: FnMut(Arc<dyn Backend>) -> Fut + Send,
        Fut: Future<Output = RelayResult<String>> + Send,
    {
        if self.backends.is_empty() {
            return Err(RelayError::exhausted(RelayError::NoBackends));
        }

        let mut last_error = RelayError::NoBackends;
        for (attempt, backend) in self.backends.iter().enumerate() {
            debug!(operation, attempt, "trying backend");
            let result = call(Arc::clone(backend)).await;
            let model = backend.model();

            match result {
                Ok(response) => {
                    if attempt > 0 {
                        info!(operation, attempt, model = %model, "fell back successfully");
                    }
                    self.record_success(model);
                    return Ok(response);
                }
                Err(error) => {
                    self.report_failure(attempt, &model, &error);
                    last_error = error;
                }
            }
        }

        Err(RelayError::exhausted(last_error))
    }
}

impl std::fmt::Debug for FallbackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOrchestrator")
            .field("backends", &self.models())
            .field("current_model", &self.current_model())
            .field("has_observer", &self.observer.is_some())
            .field("config", &self.config)
            .finish()
    }
}
