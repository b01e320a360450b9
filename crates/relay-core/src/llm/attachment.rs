//! Image buffering for replay across backend attempts
//!
//! Image sources are single-pass readers. Before the first attempt the
//! orchestrator drains each source into an immutable shared buffer, then
//! hands every attempt its own fresh reader over those bytes.

use crate::error::{RelayError, RelayResult};
use crate::llm::backend::ImageReader;
use crate::llm::messages::{Attachment, Message, MimeType, Role};
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Inline image cap used by multi-region provider adapters (4 MiB)
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 4 * 1024 * 1024;

/// Immutable bytes of a drained image source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedImage {
    bytes: Arc<[u8]>,
}

impl BufferedImage {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }

    /// A fresh, independent reader over the buffered bytes
    pub fn reader(&self) -> ImageReader {
        Box::new(Cursor::new(Arc::clone(&self.bytes)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Drain a single-pass image source.
///
/// With a `limit`, at most `limit + 1` bytes are read and a larger source is
/// rejected as invalid input.
pub async fn buffer_image(
    mut image: ImageReader,
    limit: Option<usize>,
) -> RelayResult<BufferedImage> {
    let mut buf = Vec::new();
    match limit {
        Some(max) => {
            let mut limited = (&mut image).take((max as u64).saturating_add(1));
            limited
                .read_to_end(&mut buf)
                .await
                .map_err(|e| RelayError::attachment(format!("failed to copy image data: {}", e)))?;
            if buf.len() > max {
                return Err(RelayError::invalid_input(format!(
                    "image exceeds maximum size of {} bytes",
                    max
                )));
            }
        }
        None => {
            image
                .read_to_end(&mut buf)
                .await
                .map_err(|e| RelayError::attachment(format!("failed to copy image data: {}", e)))?;
        }
    }
    Ok(BufferedImage::from_bytes(buf))
}

/// Drain several image sources, in order
pub async fn buffer_images(
    images: Vec<ImageReader>,
    limit: Option<usize>,
) -> RelayResult<Vec<BufferedImage>> {
    let mut buffers = Vec::with_capacity(images.len());
    for (i, image) in images.into_iter().enumerate() {
        let buffered = buffer_image(image, limit).await.map_err(|e| match e {
            RelayError::Attachment { message } => {
                RelayError::attachment(format!("failed to buffer image {}: {}", i, message))
            }
            other => other,
        })?;
        buffers.push(buffered);
    }
    Ok(buffers)
}

/// Fresh readers for one attempt
pub fn readers_from_buffers(buffers: &[BufferedImage]) -> Vec<ImageReader> {
    buffers.iter().map(BufferedImage::reader).collect()
}

/// A message whose image has been drained
#[derive(Debug, Clone)]
struct BufferedMessage {
    role: Role,
    image: Option<(BufferedImage, MimeType)>,
    content: Option<String>,
}

/// A conversation whose images have been drained, replayable per attempt
#[derive(Debug, Clone)]
pub struct BufferedConversation {
    messages: Vec<BufferedMessage>,
}

impl BufferedConversation {
    /// Drain every image in the conversation, keeping turn order
    pub async fn capture(messages: Vec<Message>, limit: Option<usize>) -> RelayResult<Self> {
        let mut buffered = Vec::with_capacity(messages.len());
        for (i, message) in messages.into_iter().enumerate() {
            let image = match message.image {
                Some(Attachment { reader, mime_type }) => {
                    let bytes = buffer_image(reader, limit).await.map_err(|e| match e {
                        RelayError::Attachment { message } => RelayError::attachment(format!(
                            "failed to buffer image of message {}: {}",
                            i, message
                        )),
                        other => other,
                    })?;
                    Some((bytes, mime_type))
                }
                None => None,
            };
            buffered.push(BufferedMessage {
                role: message.role,
                image,
                content: message.content,
            });
        }
        Ok(Self { messages: buffered })
    }

    /// Rebuild the conversation with fresh image readers
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .iter()
            .map(|m| Message {
                role: m.role,
                image: m
                    .image
                    .as_ref()
                    .map(|(bytes, mime_type)| Attachment::new(bytes.reader(), mime_type.clone())),
                content: m.content.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Read a whole image source into memory
#[cfg(test)]
pub(crate) async fn read_image(mut image: ImageReader) -> RelayResult<Vec<u8>> {
    let mut buf = Vec::new();
    image.read_to_end(&mut buf).await?;
    Ok(buf)
}
