use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A hosted chat-completion service.
///
/// Each provider speaks the same `chat/completions` protocol but lives at its
/// own base URL, reads its bearer token from its own environment variable and
/// serves its own fixed list of models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Groq's OpenAI-compatible endpoint.
    Groq,

    /// OpenRouter's model router.
    OpenRouter,
}

impl Provider {
    /// Every supported provider.
    pub const ALL: [Provider; 2] = [Provider::Groq, Provider::OpenRouter];

    /// The base URL requests are resolved against.  Always ends in `/`.
    pub fn base_url(&self) -> &'static str {
        match self {
            Provider::Groq => "https://api.groq.com/openai/v1/",
            Provider::OpenRouter => "https://openrouter.ai/api/v1/",
        }
    }

    /// The environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    /// The model used when none is configured.
    pub fn default_model(&self) -> Model {
        match self {
            Provider::Groq => Model::Mixtral8x7b32768,
            Provider::OpenRouter => Model::OpenAiGpt35Turbo,
        }
    }

    /// The models this provider serves.
    pub fn models(&self) -> impl Iterator<Item = Model> + '_ {
        Model::ALL
            .iter()
            .copied()
            .filter(move |model| model.provider() == *self)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Groq => write!(f, "groq"),
            Provider::OpenRouter => write!(f, "openrouter"),
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(Provider::Groq),
            "openrouter" => Ok(Provider::OpenRouter),
            _ => Err(Error::validation(
                format!("unknown provider {s:?} (expected groq or openrouter)"),
                Some("provider".to_string()),
            )),
        }
    }
}

/// A model identifier from the fixed set of supported models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    /// LLaMA 2 70B on Groq.
    #[serde(rename = "llama2-70b-4096")]
    Llama270b4096,

    /// Mixtral 8x7B on Groq.
    #[serde(rename = "mixtral-8x7b-32768")]
    Mixtral8x7b32768,

    /// Gemma 7B instruct on Groq.
    #[serde(rename = "gemma-7b-it")]
    Gemma7bIt,

    /// GPT-3.5 Turbo via OpenRouter.
    #[serde(rename = "openai/gpt-3.5-turbo")]
    OpenAiGpt35Turbo,

    /// GPT-4 Turbo preview via OpenRouter.
    #[serde(rename = "openai/gpt-4-turbo-preview")]
    OpenAiGpt4TurboPreview,

    /// Claude 3 Opus via OpenRouter.
    #[serde(rename = "anthropic/claude-3-opus-20240229")]
    Claude3Opus20240229,

    /// Claude 3 Sonnet via OpenRouter.
    #[serde(rename = "anthropic/claude-3-sonnet-20240229")]
    Claude3Sonnet20240229,

    /// Mixtral 8x7B instruct via OpenRouter.
    #[serde(rename = "mistralai/mixtral-8x7b-instruct")]
    MixtralInstruct,
}

impl Model {
    /// Every supported model, grouped by provider.
    pub const ALL: [Model; 8] = [
        Model::Llama270b4096,
        Model::Mixtral8x7b32768,
        Model::Gemma7bIt,
        Model::OpenAiGpt35Turbo,
        Model::OpenAiGpt4TurboPreview,
        Model::Claude3Opus20240229,
        Model::Claude3Sonnet20240229,
        Model::MixtralInstruct,
    ];

    /// The identifier sent on the wire.
    pub fn id(&self) -> &'static str {
        match self {
            Model::Llama270b4096 => "llama2-70b-4096",
            Model::Mixtral8x7b32768 => "mixtral-8x7b-32768",
            Model::Gemma7bIt => "gemma-7b-it",
            Model::OpenAiGpt35Turbo => "openai/gpt-3.5-turbo",
            Model::OpenAiGpt4TurboPreview => "openai/gpt-4-turbo-preview",
            Model::Claude3Opus20240229 => "anthropic/claude-3-opus-20240229",
            Model::Claude3Sonnet20240229 => "anthropic/claude-3-sonnet-20240229",
            Model::MixtralInstruct => "mistralai/mixtral-8x7b-instruct",
        }
    }

    /// The provider serving this model.
    pub fn provider(&self) -> Provider {
        match self {
            Model::Llama270b4096 | Model::Mixtral8x7b32768 | Model::Gemma7bIt => Provider::Groq,
            Model::OpenAiGpt35Turbo
            | Model::OpenAiGpt4TurboPreview
            | Model::Claude3Opus20240229
            | Model::Claude3Sonnet20240229
            | Model::MixtralInstruct => Provider::OpenRouter,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Model::ALL
            .iter()
            .copied()
            .find(|model| model.id() == s)
            .ok_or_else(|| {
                Error::validation(format!("unknown model {s:?}"), Some("model".to_string()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_serialization() {
        let json = serde_json::to_string(&Model::OpenAiGpt35Turbo).unwrap();
        assert_eq!(json, r#""openai/gpt-3.5-turbo""#);

        let json = serde_json::to_string(&Model::Gemma7bIt).unwrap();
        assert_eq!(json, r#""gemma-7b-it""#);
    }

    #[test]
    fn model_deserialization() {
        let model: Model = serde_json::from_str(r#""mixtral-8x7b-32768""#).unwrap();
        assert_eq!(model, Model::Mixtral8x7b32768);
        assert!(serde_json::from_str::<Model>(r#""gpt-99""#).is_err());
    }

    #[test]
    fn display_matches_wire_id() {
        for model in Model::ALL {
            assert_eq!(model.to_string(), model.id());
            assert_eq!(model.id().parse::<Model>().unwrap(), model);
        }
    }

    #[test]
    fn unknown_model_is_rejected() {
        let err = "claude-4-custom".parse::<Model>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn providers_partition_models() {
        let groq: Vec<Model> = Provider::Groq.models().collect();
        assert_eq!(
            groq,
            vec![
                Model::Llama270b4096,
                Model::Mixtral8x7b32768,
                Model::Gemma7bIt
            ]
        );
        let openrouter = Provider::OpenRouter.models().count();
        assert_eq!(groq.len() + openrouter, Model::ALL.len());
        for provider in Provider::ALL {
            assert_eq!(provider.default_model().provider(), provider);
            assert!(provider.base_url().ends_with('/'));
        }
    }

    #[test]
    fn provider_parsing() {
        assert_eq!("groq".parse::<Provider>().unwrap(), Provider::Groq);
        assert_eq!(" OpenRouter ".parse::<Provider>().unwrap(), Provider::OpenRouter);
        assert!("ollama".parse::<Provider>().is_err());
    }
}
