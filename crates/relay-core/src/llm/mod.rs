//! Backend capability, pooling and fallback

pub mod attachment;
pub mod backend;
pub mod fallback;
pub mod messages;
pub mod pool;
pub mod streaming;

pub use attachment::{BufferedConversation, BufferedImage, DEFAULT_MAX_ATTACHMENT_BYTES};
pub use backend::{Backend, ImageReader};
pub use fallback::{ErrorObserver, FallbackBuilder, FallbackOrchestrator};
pub use messages::{Attachment, Conversation, Message, MimeType, Role};
pub use pool::{GenerationPolicy, PoolEndpoint, RoundRobinPool, SafetySetting};
pub use streaming::{
    CLEAR_TOKEN, EventStream, StreamEvent, StreamReceiver, StreamSender, Transcript,
    collect_transcript, event_stream, stream_channel, wire_tokens,
};
