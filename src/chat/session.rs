//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the transcript,
//! sends each prompt to a [`ChatBackend`] and shows the reply through a
//! [`Renderer`].

use std::time::Duration;

use crate::chat::config::{ChatConfig, DisplayMode};
use crate::client::{ChatBackend, ChatClient, DEFAULT_SYSTEM_PROMPT, validate_prompt};
use crate::error::{Error, ErrorKind, Result};
use crate::format::{CodeBlock, format_response};
use crate::observability::{CLIENT_EMPTY_INPUTS, SESSION_INTERRUPTS, SESSION_TURNS};
use crate::render::Renderer;
use crate::reveal::{RevealStrategy, WordReveal};
use crate::transcript::Transcript;
use crate::types::{ChatCompletionRequest, Message, MessageRole, Model, Provider};

/// How often a pending request checks the renderer's interrupt flag.
const INTERRUPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What happened during one [`ChatSession::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnOutcome {
    /// The classification of the failure shown as the reply, if any.
    pub error: Option<ErrorKind>,
    /// Number of code blocks in the displayed reply.
    pub code_blocks: usize,
}

impl TurnOutcome {
    /// Returns true if the reply shown was a real answer from the model.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The provider requests go to.
    pub provider: Provider,
    /// The model used for the session.
    pub model: Model,
    /// How replies are displayed.
    pub display_mode: DisplayMode,
    /// The sampling temperature, if set.
    pub temperature: Option<f32>,
    /// The number of messages in the transcript.
    pub message_count: usize,
    /// Prompts submitted, including empty ones.
    pub turns: u64,
    /// Requests handed to the backend.
    pub requests: u64,
    /// Requests that ended in an error.
    pub failures: u64,
    /// The classification of the most recent error, if any.
    pub last_error: Option<ErrorKind>,
}

/// A chat session that manages conversation state and API interactions.
///
/// Every prompt is sent on its own: the transcript is only used for display
/// and export, never replayed to the model.
pub struct ChatSession<B: ChatBackend = ChatClient> {
    backend: B,
    config: ChatConfig,
    transcript: Transcript,
    reveal: Box<dyn RevealStrategy>,
    last_code_blocks: Vec<CodeBlock>,
    turns: u64,
    requests: u64,
    failures: u64,
    last_error: Option<ErrorKind>,
}

impl<B: ChatBackend> ChatSession<B> {
    /// Creates a new chat session with the given backend and configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configured model is not served by
    /// the backend's provider.
    pub fn new(backend: B, config: ChatConfig) -> Result<Self> {
        check_provider(backend.provider(), config.model)?;
        let reveal = Box::new(WordReveal::new(config.reveal_delay));
        Ok(Self {
            backend,
            config,
            transcript: Transcript::new(),
            reveal,
            last_code_blocks: Vec::new(),
            turns: 0,
            requests: 0,
            failures: 0,
            last_error: None,
        })
    }

    /// Replaces the strategy used in reveal mode.
    pub fn with_reveal_strategy(mut self, reveal: Box<dyn RevealStrategy>) -> Self {
        self.reveal = reveal;
        self
    }

    /// Answers one prompt.
    ///
    /// This method:
    /// 1. Adds the user message to the transcript
    /// 2. Sends the prompt to the backend, unless it is blank
    /// 3. Shows the reply (or the error text) in the active display mode
    /// 4. Adds the assistant message to the transcript
    ///
    /// Failures never escape: they are shown and stored like any other reply,
    /// and reported through the returned [`TurnOutcome`].
    pub async fn submit(&mut self, input: &str, renderer: &mut dyn Renderer) -> TurnOutcome {
        SESSION_TURNS.click();
        self.turns += 1;
        self.transcript.append(MessageRole::User, input);

        let model = self.config.model;
        let (reply, answered_by) = match validate_prompt(input) {
            Ok(prompt) => {
                self.requests += 1;
                (self.request(prompt, renderer).await, Some(model))
            }
            Err(err) => {
                CLIENT_EMPTY_INPUTS.click();
                (Err(err), None)
            }
        };

        let (text, error) = match reply {
            Ok(text) => (text, None),
            Err(err) => {
                let kind = err.kind();
                if kind != ErrorKind::EmptyInput {
                    self.failures += 1;
                }
                if err.is_abort() {
                    renderer.print_interrupted();
                }
                self.last_error = Some(kind);
                (err.to_string(), Some(kind))
            }
        };

        renderer.start_response(model);
        let (content, rendered_as_html, code_blocks) = match self.config.display_mode {
            DisplayMode::Formatted => {
                let formatted = format_response(&text);
                renderer.print_formatted(&formatted);
                self.last_code_blocks = formatted.code_blocks().cloned().collect();
                (formatted.into_markup(), true, self.last_code_blocks.len())
            }
            DisplayMode::Reveal => {
                let shown = self
                    .reveal
                    .reveal(&text, &mut |frame: &str| renderer.print_reveal_frame(frame))
                    .await;
                (shown, false, 0)
            }
        };
        renderer.finish_response();

        self.transcript.append_message(
            Message::assistant(content)
                .with_html(rendered_as_html)
                .with_model(answered_by),
        );
        TurnOutcome { error, code_blocks }
    }

    async fn request(&self, prompt: &str, renderer: &mut dyn Renderer) -> Result<String> {
        let request = ChatCompletionRequest::single_turn(
            &self.config.system_prompt,
            prompt,
            self.config.model,
        )
        .with_temperature(self.config.temperature);
        let call = self.backend.complete(&request);
        tokio::pin!(call);
        loop {
            tokio::select! {
                result = &mut call => return result,
                _ = tokio::time::sleep(INTERRUPT_POLL_INTERVAL) => {
                    if renderer.should_interrupt() {
                        SESSION_INTERRUPTS.click();
                        return Err(Error::abort("request interrupted"));
                    }
                }
            }
        }
    }

    /// Clears the transcript and forgets the last reply's code blocks.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.last_code_blocks.clear();
    }

    /// Returns the transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the number of messages in the transcript.
    pub fn message_count(&self) -> usize {
        self.transcript.len()
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the provider the backend talks to.
    pub fn provider(&self) -> Provider {
        self.backend.provider()
    }

    /// Changes the model used for responses.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the model belongs to another provider.
    pub fn set_model(&mut self, model: Model) -> Result<()> {
        check_provider(self.backend.provider(), model)?;
        self.config.model = model;
        Ok(())
    }

    /// Returns the current model.
    pub fn model(&self) -> Model {
        self.config.model
    }

    /// Changes how replies are displayed.
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.config.display_mode = mode;
    }

    /// Returns the current display mode.
    pub fn display_mode(&self) -> DisplayMode {
        self.config.display_mode
    }

    /// Sets the sampling temperature.
    pub fn set_temperature(&mut self, temperature: Option<f32>) {
        self.config.temperature = temperature;
    }

    /// Sets the system prompt; `None` restores the default.
    pub fn set_system_prompt(&mut self, prompt: Option<String>) {
        self.config.system_prompt = prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    }

    /// Returns the current system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.config.system_prompt
    }

    /// Returns code block `index` of the most recent formatted reply.
    pub fn code_block(&self, index: usize) -> Option<&CodeBlock> {
        self.last_code_blocks
            .iter()
            .find(|block| block.index() == index)
    }

    /// Returns the code blocks of the most recent formatted reply.
    pub fn code_blocks(&self) -> &[CodeBlock] {
        &self.last_code_blocks
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            provider: self.backend.provider(),
            model: self.config.model,
            display_mode: self.config.display_mode,
            temperature: self.config.temperature,
            message_count: self.transcript.len(),
            turns: self.turns,
            requests: self.requests,
            failures: self.failures,
            last_error: self.last_error,
        }
    }
}

fn check_provider(provider: Provider, model: Model) -> Result<()> {
    if model.provider() == provider {
        Ok(())
    } else {
        Err(Error::validation(
            format!("{model} is served by {}, not {provider}", model.provider()),
            Some("model".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::client::EMPTY_INPUT_GUIDANCE;
    use crate::reveal::{InstantReveal, REVEAL_CURSOR};

    #[derive(Clone)]
    enum Reply {
        Text(&'static str),
        ServerError,
        BadPayload,
        Hang,
    }

    #[derive(Clone)]
    struct StubBackend {
        provider: Provider,
        reply: Reply,
        calls: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<ChatCompletionRequest>>>,
    }

    impl StubBackend {
        fn new(reply: Reply) -> Self {
            Self {
                provider: Provider::Groq,
                reply,
                calls: Arc::new(AtomicUsize::new(0)),
                last_request: Arc::new(Mutex::new(None)),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for StubBackend {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn complete(&self, request: &ChatCompletionRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::ServerError => Err(Error::internal_server("boom", None)),
                Reply::BadPayload => Err(Error::unexpected_payload(r#"{"error":"nope"}"#)),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }
    }

    #[derive(Default)]
    struct CaptureRenderer {
        started: Vec<Model>,
        prose: Vec<String>,
        blocks: Vec<CodeBlock>,
        frames: Vec<String>,
        finished: usize,
        interrupt: bool,
        interrupted: bool,
    }

    impl Renderer for CaptureRenderer {
        fn start_response(&mut self, model: Model) {
            self.started.push(model);
        }

        fn print_text(&mut self, text: &str) {
            self.prose.push(text.to_string());
        }

        fn print_reveal_frame(&mut self, frame: &str) {
            self.frames.push(frame.to_string());
        }

        fn print_prose(&mut self, line: &str) {
            self.prose.push(line.to_string());
        }

        fn print_code_block(&mut self, block: &CodeBlock) {
            self.blocks.push(block.clone());
        }

        fn print_error(&mut self, error: &str) {
            self.prose.push(error.to_string());
        }

        fn print_info(&mut self, info: &str) {
            self.prose.push(info.to_string());
        }

        fn finish_response(&mut self) {
            self.finished += 1;
        }

        fn print_interrupted(&mut self) {
            self.interrupted = true;
        }

        fn should_interrupt(&self) -> bool {
            self.interrupt
        }
    }

    fn session(reply: Reply) -> (ChatSession<StubBackend>, Arc<AtomicUsize>) {
        let backend = StubBackend::new(reply);
        let calls = backend.calls.clone();
        (ChatSession::new(backend, ChatConfig::new()).unwrap(), calls)
    }

    #[tokio::test]
    async fn formatted_reply_is_stored_as_markup() {
        let (mut session, calls) = session(Reply::Text(
            "Here:\n```python\nprint('hi')\n```\nDone.",
        ));
        let mut renderer = CaptureRenderer::default();
        let outcome = session.submit("say hi", &mut renderer).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.code_blocks, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.prose, vec!["Here:", "Done."]);
        assert_eq!(renderer.blocks[0].text(), "print('hi')");
        assert_eq!(renderer.started, vec![Model::Mixtral8x7b32768]);
        assert_eq!(renderer.finished, 1);

        let messages = session.transcript().all();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "say hi");
        assert!(!messages[0].rendered_as_html);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert!(messages[1].rendered_as_html);
        assert!(messages[1].content.contains("id=\"code-block-0\""));
        assert_eq!(messages[1].model, Some(Model::Mixtral8x7b32768));
        assert_eq!(session.code_block(0).unwrap().text(), "print('hi')");
        assert!(session.code_block(1).is_none());
    }

    #[tokio::test]
    async fn request_carries_system_prompt_and_temperature() {
        let backend = StubBackend::new(Reply::Text("ok"));
        let last_request = backend.last_request.clone();
        let mut session = ChatSession::new(backend, ChatConfig::new()).unwrap();
        session.set_system_prompt(Some("Only Python 3.12".to_string()));
        session.set_temperature(Some(0.2));
        session.submit("hi", &mut CaptureRenderer::default()).await;

        let request = last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, "Only Python 3.12");
        assert_eq!(request.messages[1].content, "hi");
        assert_eq!(request.temperature, Some(0.2));

        session.set_system_prompt(None);
        assert_eq!(session.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn empty_input_gets_guidance_without_a_request() {
        let (mut session, calls) = session(Reply::Text("unused"));
        let mut renderer = CaptureRenderer::default();
        let outcome = session.submit("   ", &mut renderer).await;

        assert_eq!(outcome.error, Some(ErrorKind::EmptyInput));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(renderer.prose, vec![EMPTY_INPUT_GUIDANCE]);
        let reply = session.transcript().last().unwrap();
        assert!(reply.content.contains(EMPTY_INPUT_GUIDANCE));
        assert!(reply.model.is_none());

        let stats = session.stats();
        assert_eq!(stats.turns, 1);
        assert_eq!(stats.requests, 0);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn errors_are_stored_as_ordinary_replies() {
        let (mut session, _) = session(Reply::ServerError);
        session.set_display_mode(DisplayMode::Reveal);
        let mut session = session.with_reveal_strategy(Box::new(InstantReveal));
        let mut renderer = CaptureRenderer::default();
        let outcome = session.submit("hello", &mut renderer).await;

        assert_eq!(outcome.error, Some(ErrorKind::Transport));
        let reply = session.transcript().last().unwrap();
        assert_eq!(reply.role, MessageRole::Assistant);
        assert!(!reply.rendered_as_html);
        assert_eq!(reply.content, Error::internal_server("boom", None).to_string());
        assert_eq!(session.stats().failures, 1);
        assert_eq!(session.stats().last_error, Some(ErrorKind::Transport));
    }

    #[tokio::test]
    async fn unexpected_payload_is_a_format_error() {
        let (mut session, _) = session(Reply::BadPayload);
        let outcome = session.submit("hello", &mut CaptureRenderer::default()).await;
        assert_eq!(outcome.error, Some(ErrorKind::Format));
        assert!(
            session
                .transcript()
                .last()
                .unwrap()
                .content
                .contains("Unexpected response format")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_mode_stores_the_revealed_text() {
        let (mut session, _) = session(Reply::Text("use\n  a   list"));
        session.set_display_mode(DisplayMode::Reveal);
        let mut renderer = CaptureRenderer::default();
        let outcome = session.submit("how?", &mut renderer).await;

        assert_eq!(outcome.code_blocks, 0);
        assert_eq!(renderer.frames.len(), 4);
        assert!(renderer.frames[..3].iter().all(|f| f.ends_with(REVEAL_CURSOR)));
        assert_eq!(renderer.frames[3], "use a list");
        let reply = session.transcript().last().unwrap();
        assert_eq!(reply.content, "use a list");
        assert!(!reply.rendered_as_html);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_abandons_the_request() {
        let (mut session, calls) = session(Reply::Hang);
        let mut renderer = CaptureRenderer {
            interrupt: true,
            ..CaptureRenderer::default()
        };
        let outcome = session.submit("slow question", &mut renderer).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.error, Some(ErrorKind::Transport));
        assert!(renderer.interrupted);
        assert_eq!(session.message_count(), 2);
    }

    #[tokio::test]
    async fn clear_empties_the_transcript() {
        let (mut session, _) = session(Reply::Text("```\nx = 1\n```"));
        session.submit("q", &mut CaptureRenderer::default()).await;
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.code_blocks().len(), 1);

        session.clear();
        assert_eq!(session.message_count(), 0);
        assert!(session.code_block(0).is_none());
    }

    #[test]
    fn set_model_stays_within_the_provider() {
        let (mut session, _) = session(Reply::Text("ok"));
        assert_eq!(session.model(), Model::Mixtral8x7b32768);

        session.set_model(Model::Gemma7bIt).unwrap();
        assert_eq!(session.model(), Model::Gemma7bIt);

        let err = session.set_model(Model::Claude3Opus20240229).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.model(), Model::Gemma7bIt);
    }

    #[test]
    fn new_rejects_a_foreign_model() {
        let config = ChatConfig::new().with_model(Model::OpenAiGpt35Turbo);
        assert!(ChatSession::new(StubBackend::new(Reply::Text("")), config).is_err());
    }
}
