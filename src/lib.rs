//! pybot: a terminal Python-coding assistant over hosted chat-completion APIs.
//!
//! The library sends single-turn prompts to Groq or OpenRouter, formats the
//! replies into prose and numbered code blocks, and keeps a per-session
//! transcript that can be exported as HTML.  The `pybot-chat` binary wraps it
//! in an interactive shell.

// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod export;
pub mod format;
pub mod observability;
pub mod render;
pub mod reveal;
pub mod transcript;
pub mod types;

// Re-exports
pub use client::{
    ChatBackend, ChatClient, DEFAULT_SYSTEM_PROMPT, EMPTY_INPUT_GUIDANCE, validate_prompt,
};
pub use client_logger::{ClientLogger, JsonLinesLogger};
pub use error::{Error, ErrorKind, Result};
pub use export::render_transcript_html;
pub use format::{
    COPY_FEEDBACK_MS, COPY_SCRIPT, CodeBlock, FormattedResponse, Segment, format, format_response,
};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use reveal::{DEFAULT_REVEAL_DELAY, InstantReveal, REVEAL_CURSOR, RevealStrategy, WordReveal};
pub use transcript::Transcript;
pub use types::*;
