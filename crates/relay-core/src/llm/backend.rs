//! Backend capability trait
//!
//! Every provider adapter, round-robin pool and fallback orchestrator
//! implements [`Backend`], so they can be nested and substituted freely.

use crate::error::RelayResult;
use crate::llm::messages::{Message, MimeType};
use crate::llm::pool::GenerationPolicy;
use crate::llm::streaming::StreamSender;
use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// Single-pass image source
pub type ImageReader = Box<dyn AsyncRead + Send + Unpin>;

/// Unified trait for all generation backends
#[async_trait]
pub trait Backend: Send + Sync {
    /// Generate a response for a system prompt and a user prompt
    async fn generate(&self, system_prompt: &str, prompt: &str) -> RelayResult<String>;

    /// Stream a response token by token.
    ///
    /// Implementations deliver [`StreamEvent::Token`](crate::llm::StreamEvent::Token)
    /// events on `events` and finish with exactly one `Done` or `Error`.
    /// They must stop sending, and must not leave a task running, once
    /// `cancel` fires.
    async fn generate_stream(
        &self,
        system_prompt: &str,
        prompt: &str,
        events: StreamSender,
        cancel: CancellationToken,
    );

    /// Generate a response for a prompt and one image
    async fn generate_with_image(
        &self,
        prompt: &str,
        image: ImageReader,
        mime_type: MimeType,
    ) -> RelayResult<String>;

    /// Generate a response for a prompt and several images.
    ///
    /// Fails when `images.len() != mime_types.len()`.
    async fn generate_with_images(
        &self,
        prompt: &str,
        images: Vec<ImageReader>,
        mime_types: Vec<MimeType>,
    ) -> RelayResult<String>;

    /// Generate the next turn of a conversation
    async fn generate_with_messages(&self, messages: Vec<Message>) -> RelayResult<String>;

    /// Opaque model identifier
    fn model(&self) -> String;

    /// Install a generation policy for every later call. Backends without
    /// filtering support ignore it.
    fn apply_policy(&self, _policy: &GenerationPolicy) {}
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    async fn generate(&self, system_prompt: &str, prompt: &str) -> RelayResult<String> {
        (**self).generate(system_prompt, prompt).await
    }

    async fn generate_stream(
        &self,
        system_prompt: &str,
        prompt: &str,
        events: StreamSender,
        cancel: CancellationToken,
    ) {
        (**self)
            .generate_stream(system_prompt, prompt, events, cancel)
            .await
    }

    async fn generate_with_image(
        &self,
        prompt: &str,
        image: ImageReader,
        mime_type: MimeType,
    ) -> RelayResult<String> {
        (**self).generate_with_image(prompt, image, mime_type).await
    }

    async fn generate_with_images(
        &self,
        prompt: &str,
        images: Vec<ImageReader>,
        mime_types: Vec<MimeType>,
    ) -> RelayResult<String> {
        (**self)
            .generate_with_images(prompt, images, mime_types)
            .await
    }

    async fn generate_with_messages(&self, messages: Vec<Message>) -> RelayResult<String> {
        (**self).generate_with_messages(messages).await
    }

    fn model(&self) -> String {
        (**self).model()
    }

    fn apply_policy(&self, policy: &GenerationPolicy) {
        (**self).apply_policy(policy)
    }
}
