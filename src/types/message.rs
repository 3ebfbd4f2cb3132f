use serde::{Deserialize, Serialize};

use crate::types::Model;

/// Role type for a transcript message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl MessageRole {
    /// Lowercase name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// One entry of the session transcript.
///
/// A message is never mutated once it is in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Who said it.
    pub role: MessageRole,

    /// The text or, when `rendered_as_html` is set, the formatted markup.
    pub content: String,

    /// Whether `content` is markup produced by the response formatter.
    pub rendered_as_html: bool,

    /// The model that produced an assistant reply, when one did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,
}

impl Message {
    /// Create a new plain-text `Message`.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            rendered_as_html: false,
            model: None,
        }
    }

    /// Create a new user `Message`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant `Message`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Mark the content as formatter markup.
    pub fn with_html(mut self, rendered_as_html: bool) -> Self {
        self.rendered_as_html = rendered_as_html;
        self
    }

    /// Record the model that produced this message.
    pub fn with_model(mut self, model: Option<Model>) -> Self {
        self.model = model;
        self
    }
}
