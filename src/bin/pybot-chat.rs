//! Interactive PyBot shell.
//!
//! This binary provides a REPL for asking Python questions of a model hosted
//! by Groq or OpenRouter.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings (needs GROQ_API_KEY)
//! pybot-chat
//!
//! # Use OpenRouter with a specific model (needs OPENROUTER_API_KEY)
//! pybot-chat --provider openrouter --model openai/gpt-4-turbo-preview
//!
//! # Type replies out word by word
//! pybot-chat --mode reveal --reveal-delay-ms 30
//!
//! # Disable colors (useful for piping output)
//! pybot-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear chat history
//! - `/copy <n>` - Copy a code block of the last reply
//! - `/export <file.html>` - Save the transcript as HTML
//! - `/quit` - Exit the application

use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arboard::Clipboard;
use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use pybot::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use pybot::{ChatClient, JsonLinesLogger, Provider, WordReveal, render_transcript_html};

const EXPORT_TITLE: &str = "PyBot transcript";

/// Main entry point for the pybot-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("pybot-chat [OPTIONS]");
    let config = match ChatConfig::try_from(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("pybot-chat: {err}");
            std::process::exit(2);
        }
    };
    let use_color = config.use_color;

    let client = ChatClient::with_options(config.provider, None, None, Some(config.timeout));
    let mut client = match client {
        Ok(client) => client,
        Err(err) => {
            eprintln!("pybot-chat: {err}");
            std::process::exit(1);
        }
    };
    if let Some(path) = &config.log_path {
        client = client.with_logger(Arc::new(JsonLinesLogger::open(path)?));
    }

    let mut session = ChatSession::new(client, config)?;
    if !std::io::stdout().is_terminal() {
        // Piped output keeps the word framing but skips the pauses.
        session = session.with_reveal_strategy(Box::new(WordReveal::new(Duration::ZERO)));
    }

    // Flag for interrupt handling during requests
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut renderer = PlainTextRenderer::with_color(use_color).with_interrupt(interrupted.clone());
    let mut rl = DefaultEditor::new()?;

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    // Kept alive for the whole session; some platforms drop the selection
    // together with the clipboard handle.
    let mut clipboard: Option<Clipboard> = None;

    println!(
        "PyBot (provider: {}, model: {}, mode: {})",
        session.provider(),
        session.model(),
        session.display_mode()
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.clear();
                            renderer.print_info("Chat history cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(model) => match session.set_model(model) {
                            Ok(()) => renderer.print_info(&format!("Model changed to: {model}")),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::ListModels => {
                            print_models(session.provider());
                        }
                        ChatCommand::Mode(mode) => {
                            session.set_display_mode(mode);
                            renderer.print_info(&format!("Display mode set to {mode}"));
                        }
                        ChatCommand::Temperature(value) => {
                            session.set_temperature(Some(value));
                            renderer.print_info(&format!("temperature set to {:.2}", value));
                        }
                        ChatCommand::ClearTemperature => {
                            session.set_temperature(None);
                            renderer.print_info("temperature reset to model default");
                        }
                        ChatCommand::System(prompt) => {
                            let restored = prompt.is_none();
                            session.set_system_prompt(prompt);
                            if restored {
                                renderer.print_info("System prompt restored to the default.");
                            } else {
                                renderer.print_info(&format!(
                                    "System prompt set to: {}",
                                    session.system_prompt()
                                ));
                            }
                        }
                        ChatCommand::Copy(index) => {
                            copy_code_block(&session, &mut clipboard, &mut renderer, index);
                        }
                        ChatCommand::Export(path) => {
                            let page = render_transcript_html(session.transcript(), EXPORT_TITLE);
                            match std::fs::write(&path, page) {
                                Ok(()) => {
                                    renderer.print_info(&format!("Transcript exported to {path}"))
                                }
                                Err(err) => renderer
                                    .print_error(&format!("Failed to export transcript: {err}")),
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to API
                session.submit(line, &mut renderer).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn copy_code_block(
    session: &ChatSession,
    clipboard: &mut Option<Clipboard>,
    renderer: &mut PlainTextRenderer,
    index: usize,
) {
    let Some(block) = session.code_block(index) else {
        renderer.print_error(&format!(
            "No code block {index} in the last formatted reply ({} available)",
            session.code_blocks().len()
        ));
        return;
    };
    if clipboard.is_none() {
        match Clipboard::new() {
            Ok(handle) => *clipboard = Some(handle),
            Err(err) => {
                renderer.print_error(&format!("Clipboard unavailable: {err}"));
                return;
            }
        }
    }
    if let Some(handle) = clipboard.as_mut() {
        match handle.set_text(block.text().to_string()) {
            Ok(()) => renderer.print_info(&format!("Copied! ({})", block.id())),
            Err(err) => renderer.print_error(&format!("Failed to copy {}: {err}", block.id())),
        }
    }
}

fn print_models(active: Provider) {
    println!("    Available models:");
    for provider in Provider::ALL {
        let marker = if provider == active { " (active)" } else { "" };
        println!("      {provider}{marker}:");
        for model in provider.models() {
            println!("        - {model}");
        }
    }
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Provider: {}", stats.provider);
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!("      Prompts: {}", stats.turns);
    println!(
        "      Requests: {} ({} failed)",
        stats.requests, stats.failures
    );
    match stats.last_error {
        Some(kind) => println!("      Last error: {kind}"),
        None => println!("      Last error: (none)"),
    }
    println!("      Code blocks in last reply: {}", session.code_blocks().len());
}

fn print_config(session: &ChatSession) {
    let config = session.config();
    println!("    Current Configuration:");
    println!("      Provider: {}", config.provider);
    println!("      Model: {}", config.model);
    println!("      Display mode: {}", config.display_mode);
    println!("      Temperature: {}", describe_float(config.temperature));
    println!("      Reveal delay: {} ms", config.reveal_delay.as_millis());
    println!("      Timeout: {} s", config.timeout.as_secs());
    println!("      System prompt: {}", config.system_prompt);
    match config.log_path {
        Some(ref path) => println!("      Client log: {}", path.display()),
        None => println!("      Client log: (disabled)"),
    }
}

fn describe_float(value: Option<f32>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "default".to_string())
}
