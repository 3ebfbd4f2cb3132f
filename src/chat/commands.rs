//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

use crate::chat::config::DisplayMode;
use crate::types::Model;

/// Highest temperature the providers accept.
const MAX_TEMPERATURE: f32 = 2.0;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Change the model.
    Model(Model),

    /// List the models of every provider.
    ListModels,

    /// Change how replies are displayed.
    Mode(DisplayMode),

    /// Set the sampling temperature.
    Temperature(f32),

    /// Clear the sampling temperature (use model default).
    ClearTemperature,

    /// Set the system prompt.
    /// `None` restores the default PyBot prompt.
    System(Option<String>),

    /// Copy code block `n` of the last formatted reply to the clipboard.
    Copy(usize),

    /// Write the transcript to an HTML file.
    Export(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics (message count, current model, etc.).
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use pybot::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model gemma-7b-it").is_some());
/// assert!(parse_command("How do I reverse a list?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => match model.parse::<Model>() {
                Ok(model) => ChatCommand::Model(model),
                Err(_) => ChatCommand::Invalid(format!(
                    "Unknown model: {model} (use /models to list them)"
                )),
            },
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "models" => ChatCommand::ListModels,
        "mode" => match argument.map(|arg| arg.parse::<DisplayMode>()) {
            Some(Ok(mode)) => ChatCommand::Mode(mode),
            Some(Err(_)) | None => {
                ChatCommand::Invalid("/mode expects 'formatted' or 'reveal'".to_string())
            }
        },
        "temperature" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearTemperature,
            Some(arg) => match parse_f32_in_range(arg, 0.0, MAX_TEMPERATURE) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(err) => ChatCommand::Invalid(format!("/temperature {err}")),
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "copy" => match argument {
            Some(arg) => match arg.parse::<usize>() {
                Ok(index) => ChatCommand::Copy(index),
                Err(_) => ChatCommand::Invalid("/copy expects a code block number".to_string()),
            },
            None => ChatCommand::Copy(0),
        },
        "export" => match argument {
            Some(arg) => ChatCommand::Export(arg.to_string()),
            None => ChatCommand::Invalid("/export requires a file path".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_f32_in_range(value: &str, min: f32, max: f32) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| format!("expects a value between {min} and {max}"))?;
    if parsed.is_finite() && parsed >= min && parsed <= max {
        Ok(parsed)
    } else {
        Err(format!("expects a value between {min} and {max}"))
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear chat history
  /model <name>          Change the model (e.g., /model gemma-7b-it)
  /models                List available models per provider
  /mode formatted|reveal Choose how replies are displayed
  /temperature <v>       Set temperature 0.0-2.0 (use 'clear' to reset)
  /system [prompt]       Set system prompt (no argument restores the default)
  /copy [n]              Copy code block n of the last reply (default 0)
  /export <file.html>    Write the transcript as an HTML page
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
