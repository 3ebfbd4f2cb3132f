//! Chat application module for interactive PyBot conversations.
//!
//! This module provides the REPL side of pybot built on top of the
//! chat-completion client.  It supports:
//!
//! - Formatted replies with numbered, copyable code blocks
//! - A word-by-word reveal mode
//! - Slash commands for session control
//! - Configurable provider, model, system prompt, and temperature
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Transcript ownership and the request/display cycle
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatArgsError, ChatConfig, DisplayMode};
pub use session::{ChatSession, SessionStats, TurnOutcome};
