//! Streaming with mid-stream failover
//!
//! Attempts run strictly one after another. Each attempt gets its own
//! channel and a child cancellation token; the orchestrator relays that
//! channel to the caller. Once an attempt ends its receiver is dropped and
//! its task torn down, so nothing it sends afterwards can reach the caller.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::manager::FallbackOrchestrator;
use crate::error::RelayError;
use crate::llm::backend::Backend;
use crate::llm::streaming::{
    StreamEvent, StreamReceiver, StreamSender, send_or_cancel, stream_channel,
};

/// How one streaming attempt ended
#[derive(Debug)]
enum AttemptOutcome {
    Completed,
    Failed(RelayError),
    Cancelled,
    /// The caller dropped its receiver
    Detached,
}

impl FallbackOrchestrator {
    /// Run the streaming state machine on a spawned task and return the
    /// caller's receiver.
    pub fn spawn_stream(
        self: &Arc<Self>,
        system_prompt: impl Into<String>,
        prompt: impl Into<String>,
        cancel: CancellationToken,
    ) -> StreamReceiver {
        let (events, receiver) = stream_channel(self.config.stream_buffer);
        let this = Arc::clone(self);
        let system_prompt = system_prompt.into();
        let prompt = prompt.into();
        tokio::spawn(async move {
            this.stream_with_fallback(&system_prompt, &prompt, events, cancel)
                .await;
        });
        receiver
    }

    /// Stream from the first backend that completes.
    ///
    /// Tokens are relayed as they arrive. When a backend fails, a `Clear`
    /// event is sent before the next backend starts. Caller cancellation is
    /// reported as `Error(Cancelled)` and never triggers fallback. After the
    /// last backend fails, `Error(Exhausted)` carries the last failure.
    #[instrument(skip(self, system_prompt, prompt, events, cancel), fields(backends = self.backends.len()))]
    pub async fn stream_with_fallback(
        &self,
        system_prompt: &str,
        prompt: &str,
        events: StreamSender,
        cancel: CancellationToken,
    ) {
        let mut last_error: Option<RelayError> = None;

        for (attempt, backend) in self.backends.iter().enumerate() {
            if cancel.is_cancelled() {
                report_cancelled(&events);
                return;
            }

            if attempt > 0 && !emit(&events, StreamEvent::Clear, &cancel).await {
                return;
            }

            debug!(attempt, "starting stream attempt");
            match self
                .stream_attempt(backend, system_prompt, prompt, &events, &cancel)
                .await
            {
                AttemptOutcome::Completed => {
                    let model = backend.model();
                    if attempt > 0 {
                        info!(attempt, model = %model, "stream fell back successfully");
                    }
                    self.record_success(model);
                    emit(&events, StreamEvent::Done, &cancel).await;
                    return;
                }
                AttemptOutcome::Failed(error) => {
                    self.report_failure(attempt, &backend.model(), &error);
                    last_error = Some(error);
                }
                AttemptOutcome::Cancelled => {
                    report_cancelled(&events);
                    return;
                }
                AttemptOutcome::Detached => {
                    debug!(attempt, "stream receiver dropped, stopping");
                    return;
                }
            }
        }

        let error = match last_error {
            Some(last) => RelayError::exhausted(last),
            None => RelayError::AllBackendsFailed,
        };
        emit(&events, StreamEvent::Error(error), &cancel).await;
    }

    /// Run one backend and relay its events until it ends
    async fn stream_attempt(
        &self,
        backend: &Arc<dyn Backend>,
        system_prompt: &str,
        prompt: &str,
        events: &StreamSender,
        cancel: &CancellationToken,
    ) -> AttemptOutcome {
        let (attempt_events, mut attempt_receiver) = stream_channel(self.config.stream_buffer);
        let scope = cancel.child_token();

        let task = {
            let backend = Arc::clone(backend);
            let system_prompt = system_prompt.to_string();
            let prompt = prompt.to_string();
            let scope = scope.clone();
            tokio::spawn(async move {
                backend
                    .generate_stream(&system_prompt, &prompt, attempt_events, scope)
                    .await;
            })
        };

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break AttemptOutcome::Cancelled,
                event = attempt_receiver.recv() => match event {
                    Some(event @ (StreamEvent::Token(_) | StreamEvent::Clear)) => {
                        if !send_or_cancel(events, event, cancel).await {
                            break if cancel.is_cancelled() {
                                AttemptOutcome::Cancelled
                            } else {
                                AttemptOutcome::Detached
                            };
                        }
                    }
                    Some(StreamEvent::Done) => break AttemptOutcome::Completed,
                    Some(StreamEvent::Error(error)) if error.is_cancelled() => {
                        break AttemptOutcome::Cancelled;
                    }
                    Some(StreamEvent::Error(error)) => break AttemptOutcome::Failed(error),
                    None => {
                        break AttemptOutcome::Failed(RelayError::StreamInterrupted {
                            model: backend.model(),
                        });
                    }
                },
            }
        };

        // Tear the attempt down before the caller can see anything from the
        // next one.
        scope.cancel();
        drop(attempt_receiver);
        task.abort();
        let _ = task.await;

        outcome
    }
}

/// Send an event to the caller. If the caller cancelled meanwhile, report
/// the cancellation instead. Returns whether the event was delivered.
async fn emit(events: &StreamSender, event: StreamEvent, cancel: &CancellationToken) -> bool {
    if send_or_cancel(events, event, cancel).await {
        return true;
    }
    if cancel.is_cancelled() {
        report_cancelled(events);
    }
    false
}

/// Deliver the cancellation error if the caller has room for it. A caller
/// that cancelled and stopped reading does not hold the orchestrator up.
fn report_cancelled(events: &StreamSender) {
    debug!("stream cancelled by caller");
    if events
        .try_send(StreamEvent::Error(RelayError::Cancelled))
        .is_err()
    {
        debug!("cancellation not delivered, stream buffer full or closed");
    }
}
