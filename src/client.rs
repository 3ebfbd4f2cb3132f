use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, ErrorKind, Result};
use crate::observability::{
    CLIENT_EMPTY_INPUTS, CLIENT_FORMAT_ERRORS, CLIENT_REQUEST_DURATION, CLIENT_REQUESTS,
    CLIENT_TRANSPORT_ERRORS,
};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, Model, Provider};

/// The reply given instead of calling the API when the prompt is empty.
pub const EMPTY_INPUT_GUIDANCE: &str = "Please ask your Python-related query.";

/// The system instruction sent with every request unless overridden.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are PyBot, a Python coding assistant. \
Respond concisely, focus on Python, and format any code in fenced code blocks.";

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";
/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Rejects prompts that are empty once surrounding whitespace is removed.
pub fn validate_prompt(user_prompt: &str) -> Result<&str> {
    if user_prompt.trim().is_empty() {
        Err(Error::empty_input())
    } else {
        Ok(user_prompt)
    }
}

/// Something that can answer a single-turn chat-completion request.
///
/// [`ChatClient`] is the production implementation; the chat session only
/// depends on this trait.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// The provider whose models this backend accepts.
    fn provider(&self) -> Provider;

    /// Send `request` and return the text of the first choice.
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<String>;
}

/// Client for an OpenAI-compatible chat-completion endpoint.
#[derive(Clone)]
pub struct ChatClient {
    provider: Provider,
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl ChatClient {
    /// Create a new client for `provider`.
    ///
    /// The API key can be provided directly or read from the provider's
    /// environment variable (`GROQ_API_KEY` or `OPENROUTER_API_KEY`).
    pub fn new(provider: Provider, api_key: Option<String>) -> Result<Self> {
        Self::with_options(provider, api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        provider: Provider,
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var(provider.api_key_env()).map_err(|_| {
                Error::authentication(format!(
                    "API key not provided and {} environment variable not set",
                    provider.api_key_env()
                ))
            })?,
        };
        if api_key.trim().is_empty() {
            return Err(Error::authentication(format!(
                "{} is empty",
                provider.api_key_env()
            )));
        }

        let base_url = base_url.unwrap_or_else(|| provider.base_url().to_string());
        let base_url = if base_url.ends_with('/') {
            Url::parse(&base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            provider,
            api_key,
            client,
            base_url,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that observes every request and its outcome.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The provider this client talks to.
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a single-turn request: the system instruction and the user's prompt.
    ///
    /// Empty prompts are answered with [`Error::EmptyInput`] without touching
    /// the network.  No retry is attempted on failure.
    pub async fn send(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: Model,
    ) -> Result<String> {
        let user_prompt = match validate_prompt(user_prompt) {
            Ok(prompt) => prompt,
            Err(err) => {
                CLIENT_EMPTY_INPUTS.click();
                return Err(err);
            }
        };
        let request = ChatCompletionRequest::single_turn(system_prompt, user_prompt, model);
        self.send_request(&request).await
    }

    /// Send a prepared request and return the first choice's text.
    pub async fn send_request(&self, request: &ChatCompletionRequest) -> Result<String> {
        if request.model.provider() != self.provider {
            return Err(Error::validation(
                format!("model {} is not served by {}", request.model, self.provider),
                Some("model".to_string()),
            ));
        }

        CLIENT_REQUESTS.click();
        if let Some(logger) = &self.logger {
            logger.log_request(request);
        }
        let start = Instant::now();
        let result = self.execute(request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                if let Some(logger) = &self.logger {
                    logger.log_response(&response);
                }
                Ok(response.content)
            }
            Err(err) => {
                match err.kind() {
                    ErrorKind::Format => CLIENT_FORMAT_ERRORS.click(),
                    _ => CLIENT_TRANSPORT_ERRORS.click(),
                }
                if let Some(logger) = &self.logger {
                    logger.log_failure(&err);
                }
                Err(err)
            }
        }
    }

    async fn execute(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = self.base_url.join(CHAT_COMPLETIONS_PATH)?;

        let response = self
            .client
            .post(url)
            .headers(self.default_headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(e.to_string(), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(
                    format!("Timed out reading response: {}", e),
                    Some(self.timeout.as_secs_f64()),
                )
            } else {
                Error::http_client(format!("Failed to read response: {}", e), Some(Box::new(e)))
            }
        })?;
        ChatCompletionResponse::from_body(&body)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|_| {
            Error::authentication("API key contains characters not allowed in a header")
        })?;
        headers.insert(header::AUTHORIZATION, bearer);
        if self.provider == Provider::OpenRouter {
            headers.insert("x-title", HeaderValue::from_static("PyBot"));
        }
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        // OpenAI-style error envelope.
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
            param: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed_error = serde_json::from_str::<ErrorResponse>(&error_body).ok();
        let detail = parsed_error.as_ref().and_then(|e| e.error.as_ref());
        let error_type = detail.and_then(|e| e.error_type.clone());
        let error_message = detail
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| error_body.clone());
        let error_param = detail.and_then(|e| e.param.clone());

        match status_code {
            400 => Error::bad_request(error_message, error_param),
            // A rejected key is reported like any other failed request, not as a startup error.
            401 => Error::api(
                401,
                Some("authentication_error".to_string()),
                error_message,
                request_id,
            ),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message, request_id),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message, request_id),
        }
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ChatBackend for ChatClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<String> {
        self.send_request(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ChatClient::new(Provider::Groq, Some("test-key".to_string())).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.base_url.as_str(), Provider::Groq.base_url());
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = ChatClient::with_options(
            Provider::OpenRouter,
            Some("test-key".to_string()),
            Some("https://custom-api.example.com/v1".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "https://custom-api.example.com/v1/");
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(
            client.base_url.join(CHAT_COMPLETIONS_PATH).unwrap().as_str(),
            "https://custom-api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn blank_api_key_is_a_startup_error() {
        let err = ChatClient::new(Provider::Groq, Some("   ".to_string())).unwrap_err();
        assert!(err.is_authentication());
        assert!(err.is_fatal());
    }

    #[test]
    fn bad_base_url_is_a_startup_error() {
        let err = ChatClient::with_options(
            Provider::Groq,
            Some("k".to_string()),
            Some("not a url".to_string()),
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StartupConfig);
    }

    #[test]
    fn debug_hides_api_key() {
        let client = ChatClient::new(Provider::Groq, Some("sk-secret".to_string())).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("Groq"));
    }

    #[test]
    fn validate_prompt_rejects_blank_input() {
        assert!(validate_prompt("").unwrap_err().is_empty_input());
        assert!(validate_prompt(" \n\t ").unwrap_err().is_empty_input());
        assert_eq!(validate_prompt(" x ").unwrap(), " x ");
    }

    #[tokio::test]
    async fn empty_prompt_makes_no_request() {
        // Port 9 is discard; a request here would fail with a transport error.
        let client = ChatClient::with_options(
            Provider::Groq,
            Some("k".to_string()),
            Some("http://127.0.0.1:9/".to_string()),
            Some(Duration::from_millis(200)),
        )
        .unwrap();
        let err = client
            .send(DEFAULT_SYSTEM_PROMPT, "   ", Model::Gemma7bIt)
            .await
            .unwrap_err();
        assert!(err.is_empty_input());
        assert_eq!(err.to_string(), EMPTY_INPUT_GUIDANCE);
    }

    #[tokio::test]
    async fn foreign_model_is_rejected_locally() {
        let client = ChatClient::new(Provider::Groq, Some("k".to_string())).unwrap();
        let err = client
            .send(DEFAULT_SYSTEM_PROMPT, "hello", Model::OpenAiGpt35Turbo)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
