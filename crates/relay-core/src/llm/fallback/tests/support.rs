//! Scripted backends shared by the fallback tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{RelayError, RelayResult};
use crate::llm::attachment::read_image;
use crate::llm::backend::{Backend, ImageReader};
use crate::llm::fallback::ErrorObserver;
use crate::llm::messages::{Message, MimeType, Role};
use crate::llm::pool::GenerationPolicy;
use crate::llm::streaming::{StreamEvent, StreamReceiver, StreamSender, send_or_cancel};

/// What a scripted backend does when asked to stream
#[derive(Debug, Clone)]
pub(super) enum StreamScript {
    /// Send the tokens, then `Done`
    Complete(Vec<&'static str>),
    /// Send the tokens, then `Error`
    Fail(Vec<&'static str>, RelayError),
    /// Send the tokens, then wait for cancellation
    Hang(Vec<&'static str>),
    /// Send the tokens, then drop the sender without a terminal event
    CloseEarly(Vec<&'static str>),
    /// Send the tokens and `Error`, then keep sending "late" tokens from a
    /// detached task until the receiver is gone
    FailThenBabble(Vec<&'static str>, RelayError),
}

pub(super) struct ScriptedBackend {
    model: String,
    reply: RelayResult<String>,
    script: StreamScript,
    pub calls: AtomicUsize,
    pub images_seen: Mutex<Vec<Vec<u8>>>,
    pub turns_seen: Mutex<Vec<(Role, Option<String>)>>,
    pub policies: Mutex<Vec<GenerationPolicy>>,
}

impl ScriptedBackend {
    /// Backend that answers `reply` and streams it as one token
    pub fn ok(model: &str, reply: &'static str) -> Arc<Self> {
        Arc::new(Self::new(
            model,
            Ok(reply.to_string()),
            StreamScript::Complete(vec![reply]),
        ))
    }

    /// Backend that fails every call with a generation error
    pub fn failing(model: &str, message: &str) -> Arc<Self> {
        let error = RelayError::generation_with_model(message, model);
        Arc::new(Self::new(
            model,
            Err(error.clone()),
            StreamScript::Fail(Vec::new(), error),
        ))
    }

    /// Backend with an explicit stream script
    pub fn streaming(model: &str, script: StreamScript) -> Arc<Self> {
        Arc::new(Self::new(model, Ok(String::new()), script))
    }

    /// Backend whose one-shot calls return `error`
    pub fn erroring(model: &str, error: RelayError) -> Arc<Self> {
        Arc::new(Self::new(
            model,
            Err(error.clone()),
            StreamScript::Fail(Vec::new(), error),
        ))
    }

    fn new(model: &str, reply: RelayResult<String>, script: StreamScript) -> Self {
        Self {
            model: model.to_string(),
            reply,
            script,
            calls: AtomicUsize::new(0),
            images_seen: Mutex::new(Vec::new()),
            turns_seen: Mutex::new(Vec::new()),
            policies: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn consume(&self, image: ImageReader) -> RelayResult<()> {
        let bytes = read_image(image).await?;
        self.images_seen.lock().push(bytes);
        Ok(())
    }

    async fn send_tokens(
        tokens: &[&'static str],
        events: &StreamSender,
        cancel: &CancellationToken,
    ) -> bool {
        for token in tokens {
            if !send_or_cancel(events, StreamEvent::token(*token), cancel).await {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn generate(&self, _system_prompt: &str, _prompt: &str) -> RelayResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }

    async fn generate_stream(
        &self,
        _system_prompt: &str,
        _prompt: &str,
        events: StreamSender,
        cancel: CancellationToken,
    ) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.clone() {
            StreamScript::Complete(tokens) => {
                if Self::send_tokens(&tokens, &events, &cancel).await {
                    send_or_cancel(&events, StreamEvent::Done, &cancel).await;
                }
            }
            StreamScript::Fail(tokens, error) => {
                if Self::send_tokens(&tokens, &events, &cancel).await {
                    send_or_cancel(&events, StreamEvent::Error(error), &cancel).await;
                }
            }
            StreamScript::Hang(tokens) => {
                Self::send_tokens(&tokens, &events, &cancel).await;
                cancel.cancelled().await;
            }
            StreamScript::CloseEarly(tokens) => {
                Self::send_tokens(&tokens, &events, &cancel).await;
            }
            StreamScript::FailThenBabble(tokens, error) => {
                if !Self::send_tokens(&tokens, &events, &cancel).await {
                    return;
                }
                if events.send(StreamEvent::Error(error)).await.is_err() {
                    return;
                }
                tokio::spawn(async move {
                    while events.send(StreamEvent::token("late")).await.is_ok() {
                        tokio::task::yield_now().await;
                    }
                });
            }
        }
    }

    async fn generate_with_image(
        &self,
        _prompt: &str,
        image: ImageReader,
        _mime_type: MimeType,
    ) -> RelayResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.consume(image).await?;
        self.reply.clone()
    }

    async fn generate_with_images(
        &self,
        _prompt: &str,
        images: Vec<ImageReader>,
        mime_types: Vec<MimeType>,
    ) -> RelayResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if images.len() != mime_types.len() {
            return Err(RelayError::invalid_input("number of images and mime types must match"));
        }
        for image in images {
            self.consume(image).await?;
        }
        self.reply.clone()
    }

    async fn generate_with_messages(&self, messages: Vec<Message>) -> RelayResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for message in messages {
            self.turns_seen
                .lock()
                .push((message.role, message.content.clone()));
            if let Some(attachment) = message.image {
                self.consume(attachment.reader).await?;
            }
        }
        self.reply.clone()
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn apply_policy(&self, policy: &GenerationPolicy) {
        self.policies.lock().push(policy.clone());
    }
}

/// Upcast scripted backends into a priority list
pub(super) fn chain(backends: &[&Arc<ScriptedBackend>]) -> Vec<Arc<dyn Backend>> {
    backends
        .iter()
        .map(|b| Arc::clone(*b) as Arc<dyn Backend>)
        .collect()
}

pub(super) type ErrorLog = Arc<Mutex<Vec<(String, RelayError)>>>;

/// Observer that records every failure it sees
pub(super) fn recording_observer() -> (Arc<dyn ErrorObserver>, ErrorLog) {
    let log: ErrorLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let observer = move |model: &str, error: &RelayError| {
        sink.lock().push((model.to_string(), error.clone()));
    };
    (Arc::new(observer), log)
}

/// Models recorded by an observer, in order
pub(super) fn observed_models(log: &ErrorLog) -> Vec<String> {
    log.lock().iter().map(|(model, _)| model.clone()).collect()
}

/// Read events until a terminal one, failing the test if that takes too long
pub(super) async fn drain(receiver: &mut StreamReceiver) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("stream stalled")
            .expect("stream closed before a terminal event");
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}
