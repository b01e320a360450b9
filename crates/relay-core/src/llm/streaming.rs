//! Streaming event types and consumer helpers

use crate::error::{RelayError, RelayResult};
use futures::Stream;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Reserved token telling the consumer to discard everything streamed so far
pub const CLEAR_TOKEN: &str = "[CLEAR]";

/// Default capacity of stream channels
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// One event on a generation stream.
///
/// `Done` and `Error` are terminal: nothing follows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A piece of generated text
    Token(String),
    /// Discard the partial output received so far
    Clear,
    /// The stream completed successfully
    Done,
    /// The stream failed
    Error(RelayError),
}

impl StreamEvent {
    /// Create a token event
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token(text.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }

    /// Text form of a result-channel event. `Clear` maps to [`CLEAR_TOKEN`];
    /// terminal events have no text form.
    pub fn wire_token(&self) -> Option<&str> {
        match self {
            Self::Token(text) => Some(text),
            Self::Clear => Some(CLEAR_TOKEN),
            Self::Done | Self::Error(_) => None,
        }
    }
}

/// Sending half of a generation stream
pub type StreamSender = mpsc::Sender<StreamEvent>;

/// Receiving half of a generation stream
pub type StreamReceiver = mpsc::Receiver<StreamEvent>;

/// Create a stream channel
pub fn stream_channel(buffer: usize) -> (StreamSender, StreamReceiver) {
    mpsc::channel(buffer.max(1))
}

/// Send an event unless `cancel` fires first.
///
/// Returns `false` when the event was not delivered, either because the
/// token was cancelled or the receiver is gone.
pub async fn send_or_cancel(
    events: &StreamSender,
    event: StreamEvent,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}

/// Stream of events, ending after the first terminal event
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Adapt a receiver into a [`Stream`] that ends after the first terminal
/// event.
pub fn event_stream(events: StreamReceiver) -> EventStream {
    let mut finished = false;
    Box::pin(ReceiverStream::new(events).map_while(move |event| {
        if finished {
            return None;
        }
        finished = event.is_terminal();
        Some(event)
    }))
}

/// Text-only view of a stream: tokens plus the `"[CLEAR]"` sentinel,
/// ending at the first terminal event.
pub fn wire_tokens(events: StreamReceiver) -> Pin<Box<dyn Stream<Item = String> + Send>> {
    Box::pin(
        ReceiverStream::new(events).map_while(|event| event.wire_token().map(str::to_string)),
    )
}

/// Visible transcript of a stream, honouring clear events
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    text: String,
    clears: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a non-terminal event. Terminal events are ignored.
    pub fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Token(text) => self.text.push_str(text),
            StreamEvent::Clear => {
                self.text.clear();
                self.clears += 1;
            }
            StreamEvent::Done | StreamEvent::Error(_) => {}
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of clear events seen
    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Drain a stream into its final visible text.
///
/// Returns the error carried by an `Error` event, or
/// [`RelayError::AllBackendsFailed`] when the channel closes before a
/// terminal event arrives.
pub async fn collect_transcript(mut events: StreamReceiver) -> RelayResult<String> {
    let mut transcript = Transcript::new();
    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Done => return Ok(transcript.into_text()),
            StreamEvent::Error(error) => return Err(error),
            other => transcript.apply(&other),
        }
    }
    Err(RelayError::AllBackendsFailed)
}
