use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::Model;

/// Sampling temperature sent with every request unless overridden.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Role of a turn on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions that frame the conversation.
    System,

    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

/// One conversation turn in a chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessageParam {
    /// The role of the message.
    pub role: ChatRole,

    /// The text of the message.
    pub content: String,
}

impl ChatMessageParam {
    /// Create a new `ChatMessageParam`.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }
}

/// Body of a `POST chat/completions` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    /// The model that will answer.
    pub model: Model,

    /// The conversation turns.
    pub messages: Vec<ChatMessageParam>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
    /// Create a request with exactly two turns: the system instruction and the user's prompt.
    ///
    /// No earlier turns are ever included, so every request is independent
    /// of the conversation so far.
    pub fn single_turn(system_prompt: &str, user_prompt: &str, model: Model) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessageParam::system(system_prompt),
                ChatMessageParam::user(user_prompt),
            ],
            temperature: Some(DEFAULT_TEMPERATURE),
        }
    }

    /// Override the sampling temperature.  `None` omits the field.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Token accounting, when the provider reports it.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct CompletionUsage {
    /// Tokens in the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,

    /// Tokens in the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
}

/// A recognized `chat/completions` response.
///
/// Only the first choice's content is required.  The other fields are
/// picked up when they carry the expected type and left empty otherwise.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatCompletionResponse {
    /// Response identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The content of `choices[0].message`.
    pub content: String,

    /// Why generation of the first choice stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Token accounting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionUsage>,
}

const REPLY_CONTENT_POINTER: &str = "/choices/0/message/content";

impl ChatCompletionResponse {
    /// Parse a response body, requiring `choices[0].message.content`.
    ///
    /// Any body without that string, including one that is not JSON at all,
    /// becomes [`Error::UnexpectedPayload`] carrying the body verbatim.
    pub fn from_body(body: &str) -> Result<Self> {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return Err(Error::unexpected_payload(body));
        };
        let Some(content) = value.pointer(REPLY_CONTENT_POINTER).and_then(Value::as_str) else {
            return Err(Error::unexpected_payload(body));
        };
        Ok(Self {
            id: value.get("id").and_then(Value::as_str).map(String::from),
            content: content.to_string(),
            finish_reason: value
                .pointer("/choices/0/finish_reason")
                .and_then(Value::as_str)
                .map(String::from),
            usage: value.get("usage").filter(|usage| usage.is_object()).map(|usage| {
                CompletionUsage {
                    prompt_tokens: usage.get("prompt_tokens").and_then(Value::as_u64),
                    completion_tokens: usage.get("completion_tokens").and_then(Value::as_u64),
                }
            }),
        })
    }

    /// The content of the first choice.
    pub fn reply_text(&self) -> &str {
        &self.content
    }
}
