//! Backend capability of the fallback orchestrator

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::manager::FallbackOrchestrator;
use crate::error::{RelayError, RelayResult};
use crate::llm::attachment::{BufferedConversation, buffer_image, buffer_images, readers_from_buffers};
use crate::llm::backend::{Backend, ImageReader};
use crate::llm::messages::{Message, MimeType};
use crate::llm::pool::GenerationPolicy;
use crate::llm::streaming::StreamSender;

#[async_trait]
impl Backend for FallbackOrchestrator {
    #[instrument(skip(self, system_prompt, prompt), fields(backends = self.backends.len()))]
    async fn generate(&self, system_prompt: &str, prompt: &str) -> RelayResult<String> {
        self.run_with_fallback("generate", move |backend| async move {
            backend.generate(system_prompt, prompt).await
        })
        .await
    }

    /// Stream with mid-stream failover. See [`FallbackOrchestrator::stream_with_fallback`].
    async fn generate_stream(
        &self,
        system_prompt: &str,
        prompt: &str,
        events: StreamSender,
        cancel: CancellationToken,
    ) {
        self.stream_with_fallback(system_prompt, prompt, events, cancel)
            .await
    }

    #[instrument(skip(self, prompt, image, mime_type), fields(backends = self.backends.len(), mime_type = %mime_type))]
    async fn generate_with_image(
        &self,
        prompt: &str,
        image: ImageReader,
        mime_type: MimeType,
    ) -> RelayResult<String> {
        let buffered = buffer_image(image, self.config.max_attachment_bytes).await?;

        self.run_with_fallback("generate_with_image", move |backend| {
            let image = buffered.reader();
            let mime_type = mime_type.clone();
            async move { backend.generate_with_image(prompt, image, mime_type).await }
        })
        .await
    }

    #[instrument(skip(self, prompt, images, mime_types), fields(backends = self.backends.len(), images = images.len()))]
    async fn generate_with_images(
        &self,
        prompt: &str,
        images: Vec<ImageReader>,
        mime_types: Vec<MimeType>,
    ) -> RelayResult<String> {
        if images.len() != mime_types.len() {
            return Err(RelayError::invalid_input(format!(
                "number of images ({}) does not match number of mime types ({})",
                images.len(),
                mime_types.len()
            )));
        }

        let buffers = buffer_images(images, self.config.max_attachment_bytes).await?;

        self.run_with_fallback("generate_with_images", move |backend| {
            let images = readers_from_buffers(&buffers);
            let mime_types = mime_types.clone();
            async move {
                backend
                    .generate_with_images(prompt, images, mime_types)
                    .await
            }
        })
        .await
    }

    #[instrument(skip(self, messages), fields(backends = self.backends.len(), messages = messages.len()))]
    async fn generate_with_messages(&self, messages: Vec<Message>) -> RelayResult<String> {
        let conversation =
            BufferedConversation::capture(messages, self.config.max_attachment_bytes).await?;

        self.run_with_fallback("generate_with_messages", move |backend| {
            let messages = conversation.messages();
            async move { backend.generate_with_messages(messages).await }
        })
        .await
    }

    /// Model of the backend that succeeded last
    fn model(&self) -> String {
        self.current_model()
    }

    /// Forward a policy to every backend
    fn apply_policy(&self, policy: &GenerationPolicy) {
        for backend in &self.backends {
            backend.apply_policy(policy);
        }
    }
}
