//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::{DEFAULT_SYSTEM_PROMPT, DEFAULT_TIMEOUT};
use crate::error::Error;
use crate::reveal::DEFAULT_REVEAL_DELAY;
use crate::types::{DEFAULT_TEMPERATURE, Model, Provider};

/// How assistant replies are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayMode {
    /// Split the reply into prose and numbered code blocks.
    #[default]
    Formatted,

    /// Type the reply out word by word, without formatting.
    Reveal,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Formatted => write!(f, "formatted"),
            DisplayMode::Reveal => write!(f, "reveal"),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "formatted" | "format" => Ok(DisplayMode::Formatted),
            "reveal" | "typing" => Ok(DisplayMode::Reveal),
            _ => Err(Error::validation(
                format!("unknown display mode {s:?} (expected formatted or reveal)"),
                Some("mode".to_string()),
            )),
        }
    }
}

/// Command-line arguments for the pybot-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Provider to talk to.
    #[arrrg(optional, "Provider: groq or openrouter (default: groq)", "PROVIDER")]
    pub provider: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default depends on provider)", "MODEL")]
    pub model: Option<String>,

    /// System prompt sent with every request.
    #[arrrg(optional, "System prompt for every request", "PROMPT")]
    pub system: Option<String>,

    /// How replies are displayed.
    #[arrrg(optional, "Display mode: formatted or reveal (default: formatted)", "MODE")]
    pub mode: Option<String>,

    /// Delay between revealed words.
    #[arrrg(optional, "Milliseconds between revealed words (default: 50)", "MS")]
    pub reveal_delay_ms: Option<u64>,

    /// Request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Append a JSON line per API interaction to this file.
    #[arrrg(optional, "Log API interactions to this file (JSON lines)", "PATH")]
    pub log: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// An invalid command-line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatArgsError {
    /// The offending argument.
    pub argument: &'static str,
    /// What was wrong with it.
    pub message: String,
}

impl ChatArgsError {
    fn new(argument: &'static str, message: impl fmt::Display) -> Self {
        Self {
            argument,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ChatArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}: {}", self.argument.replace('_', "-"), self.message)
    }
}

impl std::error::Error for ChatArgsError {}

impl From<ChatArgsError> for Error {
    fn from(err: ChatArgsError) -> Self {
        Error::validation(err.message, Some(err.argument.to_string()))
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The provider requests go to.
    pub provider: Provider,

    /// The model to use for generating responses; always served by `provider`.
    pub model: Model,

    /// System instruction sent as the first turn of every request.
    pub system_prompt: String,

    /// Sampling temperature; `None` omits it from requests.
    pub temperature: Option<f32>,

    /// How replies are displayed.
    pub display_mode: DisplayMode,

    /// Delay between words in reveal mode.
    pub reveal_delay: Duration,

    /// Request timeout.
    pub timeout: Duration,

    /// Optional JSON-lines log of API interactions.
    pub log_path: Option<PathBuf>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Provider: groq, with its default model
    /// - Temperature: 0.7
    /// - Display mode: formatted
    /// - Reveal delay: 50 ms
    /// - Timeout: 60 s
    /// - Color: enabled
    pub fn new() -> Self {
        Self::for_provider(Provider::Groq)
    }

    /// Creates a default configuration for `provider`.
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            provider,
            model: provider.default_model(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            display_mode: DisplayMode::Formatted,
            reveal_delay: DEFAULT_REVEAL_DELAY,
            timeout: DEFAULT_TIMEOUT,
            log_path: None,
            use_color: true,
        }
    }

    /// Sets the model, switching the provider to the one that serves it.
    pub fn with_model(mut self, model: Model) -> Self {
        self.provider = model.provider();
        self.model = model;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = prompt;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the display mode.
    pub fn with_display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = mode;
        self
    }

    /// Sets the reveal delay.
    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = delay;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the client log path.
    pub fn with_log_path(mut self, path: Option<PathBuf>) -> Self {
        self.log_path = path;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = ChatArgsError;

    fn try_from(args: ChatArgs) -> Result<Self, Self::Error> {
        let provider = args
            .provider
            .as_deref()
            .map(|s| s.parse::<Provider>())
            .transpose()
            .map_err(|err| ChatArgsError::new("provider", err))?;
        let model = args
            .model
            .as_deref()
            .map(|s| s.parse::<Model>())
            .transpose()
            .map_err(|err| ChatArgsError::new("model", err))?;

        let mut config = match (provider, model) {
            (Some(provider), Some(model)) if model.provider() != provider => {
                return Err(ChatArgsError::new(
                    "model",
                    format!("{model} is not served by {provider}"),
                ));
            }
            (_, Some(model)) => ChatConfig::new().with_model(model),
            (Some(provider), None) => ChatConfig::for_provider(provider),
            (None, None) => ChatConfig::new(),
        };

        if let Some(system) = args.system {
            config.system_prompt = system;
        }
        if let Some(mode) = args.mode {
            config.display_mode = mode
                .parse()
                .map_err(|err| ChatArgsError::new("mode", err))?;
        }
        if let Some(ms) = args.reveal_delay_ms {
            config.reveal_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = args.timeout_secs {
            if secs == 0 {
                return Err(ChatArgsError::new("timeout_secs", "must be positive"));
            }
            config.timeout = Duration::from_secs(secs);
        }
        config.log_path = args.log.map(PathBuf::from);
        config.use_color = !args.no_color;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.provider, Provider::Groq);
        assert_eq!(config.model, Model::Mixtral8x7b32768);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.display_mode, DisplayMode::Formatted);
        assert_eq!(config.reveal_delay, Duration::from_millis(50));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.log_path.is_none());
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            provider: Some("openrouter".to_string()),
            model: Some("anthropic/claude-3-opus-20240229".to_string()),
            system: Some("You are helpful.".to_string()),
            mode: Some("reveal".to_string()),
            reveal_delay_ms: Some(10),
            timeout_secs: Some(5),
            log: Some("client.jsonl".to_string()),
            no_color: true,
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.provider, Provider::OpenRouter);
        assert_eq!(config.model, Model::Claude3Opus20240229);
        assert_eq!(config.system_prompt, "You are helpful.");
        assert_eq!(config.display_mode, DisplayMode::Reveal);
        assert_eq!(config.reveal_delay, Duration::from_millis(10));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.log_path, Some(PathBuf::from("client.jsonl")));
        assert!(!config.use_color);
    }

    #[test]
    fn model_alone_selects_its_provider() {
        let args = ChatArgs {
            model: Some("openai/gpt-4-turbo-preview".to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.provider, Provider::OpenRouter);
    }

    #[test]
    fn provider_alone_selects_its_default_model() {
        let args = ChatArgs {
            provider: Some("openrouter".to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.model, Provider::OpenRouter.default_model());
    }

    #[test]
    fn invalid_args_are_rejected() {
        let mismatched = ChatArgs {
            provider: Some("groq".to_string()),
            model: Some("openai/gpt-3.5-turbo".to_string()),
            ..ChatArgs::default()
        };
        assert_eq!(ChatConfig::try_from(mismatched).unwrap_err().argument, "model");

        let unknown = ChatArgs {
            model: Some("llama3".to_string()),
            ..ChatArgs::default()
        };
        assert_eq!(ChatConfig::try_from(unknown).unwrap_err().argument, "model");

        let mode = ChatArgs {
            mode: Some("fancy".to_string()),
            ..ChatArgs::default()
        };
        let err = ChatConfig::try_from(mode).unwrap_err();
        assert_eq!(err.argument, "mode");
        assert!(Error::from(err).is_fatal());

        let timeout = ChatArgs {
            timeout_secs: Some(0),
            ..ChatArgs::default()
        };
        let err = ChatConfig::try_from(timeout).unwrap_err();
        assert!(err.to_string().starts_with("--timeout-secs"));
    }

    #[test]
    fn display_mode_parsing() {
        assert_eq!("Formatted".parse::<DisplayMode>().unwrap(), DisplayMode::Formatted);
        assert_eq!("reveal".parse::<DisplayMode>().unwrap(), DisplayMode::Reveal);
        assert!("markdown".parse::<DisplayMode>().is_err());
        assert_eq!(DisplayMode::Reveal.to_string(), "reveal");
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model(Model::OpenAiGpt35Turbo)
            .with_system_prompt("Test prompt".to_string())
            .with_temperature(None)
            .with_display_mode(DisplayMode::Reveal)
            .with_reveal_delay(Duration::from_millis(1))
            .with_timeout(Duration::from_secs(2))
            .with_log_path(Some(PathBuf::from("log.jsonl")))
            .without_color();

        assert_eq!(config.provider, Provider::OpenRouter);
        assert_eq!(config.model, Model::OpenAiGpt35Turbo);
        assert_eq!(config.system_prompt, "Test prompt");
        assert!(config.temperature.is_none());
        assert_eq!(config.display_mode, DisplayMode::Reveal);
        assert_eq!(config.reveal_delay, Duration::from_millis(1));
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.log_path, Some(PathBuf::from("log.jsonl")));
        assert!(!config.use_color);
    }
}
