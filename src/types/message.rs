//! Provider-agnostic conversation turns.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One conversation turn: a role, its text and at most one attached image.
///
/// Images are kept as raw bytes (usually a screenshot); each driver encodes
/// them into its own wire shape at request-build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub image: Option<Bytes>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, text)
    }

    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: text.into(),
            image: None,
        }
    }

    /// Attach raw image bytes, replacing any image already present.
    pub fn with_image(mut self, image: impl Into<Bytes>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn contains_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn is_system(&self) -> bool {
        self.role == MessageRole::System
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}
