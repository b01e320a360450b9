//! Conversation message types

use super::backend::ImageReader;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (instructions)
    System,
    /// User message (human input)
    User,
    /// Assistant message (model response)
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Declared mime type of an image attachment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MimeType {
    Png,
    Jpeg,
    Webp,
    Heic,
    Heif,
    /// Any other declared type, passed through untouched
    Other(String),
}

impl MimeType {
    /// The full mime type string, e.g. `image/png`
    pub fn as_str(&self) -> &str {
        match self {
            MimeType::Png => "image/png",
            MimeType::Jpeg => "image/jpeg",
            MimeType::Webp => "image/webp",
            MimeType::Heic => "image/heic",
            MimeType::Heif => "image/heif",
            MimeType::Other(value) => value,
        }
    }

    /// The image format without the `image/` prefix
    pub fn format(&self) -> &str {
        let value = self.as_str();
        value.strip_prefix("image/").unwrap_or(value)
    }
}

impl From<&str> for MimeType {
    fn from(value: &str) -> Self {
        match value {
            "image/png" => MimeType::Png,
            "image/jpeg" => MimeType::Jpeg,
            "image/webp" => MimeType::Webp,
            "image/heic" => MimeType::Heic,
            "image/heif" => MimeType::Heif,
            other => MimeType::Other(other.to_string()),
        }
    }
}

impl From<String> for MimeType {
    fn from(value: String) -> Self {
        MimeType::from(value.as_str())
    }
}

impl From<MimeType> for String {
    fn from(value: MimeType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image attached to a message.
///
/// The reader is single-pass: once a backend consumed it, it cannot be
/// replayed. The orchestrator buffers it before the first attempt.
pub struct Attachment {
    pub reader: ImageReader,
    pub mime_type: MimeType,
}

impl Attachment {
    pub fn new(reader: ImageReader, mime_type: impl Into<MimeType>) -> Self {
        Self {
            reader,
            mime_type: mime_type.into(),
        }
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// A single chat turn.
///
/// Text, image, or both may be set. A message with neither is rejected by
/// provider adapters, not by the orchestrator.
#[derive(Debug)]
pub struct Message {
    pub role: Role,
    pub image: Option<Attachment>,
    pub content: Option<String>,
}

impl Message {
    /// Create a text message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            image: None,
            content: Some(content.into()),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an image-only message
    pub fn image(role: Role, reader: ImageReader, mime_type: impl Into<MimeType>) -> Self {
        Self {
            role,
            image: Some(Attachment::new(reader, mime_type)),
            content: None,
        }
    }

    /// Attach an image to this message
    pub fn with_image(mut self, reader: ImageReader, mime_type: impl Into<MimeType>) -> Self {
        self.image = Some(Attachment::new(reader, mime_type));
        self
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// True when neither text nor image is set
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.content.as_deref().is_none_or(str::is_empty)
    }
}

/// Ordered chat turns; order is preserved across every backend attempt
pub type Conversation = Vec<Message>;
