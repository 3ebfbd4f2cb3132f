//! Output rendering for the chat shell.
//!
//! This module provides the [`Renderer`] trait the chat session pushes its
//! output into, and a plain-text terminal implementation.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::format::{CodeBlock, FormattedResponse, Segment};
use crate::reveal::REVEAL_CURSOR;
use crate::types::Model;

/// ANSI escape code for dim text (used for the reveal cursor and hints).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for the reply header).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for code block labels).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for code).
const ANSI_YELLOW: &str = "\x1b[33m";

/// Erases the single-column cursor that was last printed.
const ERASE_CURSOR: &str = "\x08 \x08";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Capturing output in tests
pub trait Renderer: Send {
    /// Called before an assistant reply is shown.
    fn start_response(&mut self, model: Model) {
        _ = model;
    }

    /// Print a chunk of regular text.
    fn print_text(&mut self, text: &str);

    /// Show one frame of a progressive reveal.
    ///
    /// Frames grow monotonically; a frame ending in [`REVEAL_CURSOR`] is
    /// intermediate, the final frame has no cursor.
    fn print_reveal_frame(&mut self, frame: &str);

    /// Print one prose line of a formatted reply.
    fn print_prose(&mut self, line: &str);

    /// Print a code block of a formatted reply together with its copy affordance.
    fn print_code_block(&mut self, block: &CodeBlock);

    /// Print a formatted reply segment by segment.
    fn print_formatted(&mut self, response: &FormattedResponse) {
        for segment in response.segments() {
            match segment {
                Segment::Prose(line) => self.print_prose(line),
                Segment::Code(block) => self.print_code_block(block),
            }
        }
    }

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a response is complete.
    ///
    /// Used to ensure proper newlines and cleanup after output.
    fn finish_response(&mut self);

    /// Called when a pending request is interrupted by the user.
    fn print_interrupted(&mut self) {}

    /// Returns true if the pending request should be abandoned.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// This renderer outputs text directly to stdout.  Reveal frames are printed
/// as deltas, so a growing reply is written once and the cursor is erased
/// with a backspace before each new word.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    revealed: usize,
    cursor_shown: bool,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            revealed: 0,
            cursor_shown: false,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Flushes stdout to ensure immediate display.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn erase_cursor(&mut self) {
        if self.cursor_shown {
            print!("{ERASE_CURSOR}");
            self.cursor_shown = false;
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self, model: Model) {
        if self.use_color {
            println!("{ANSI_BOLD}PyBot{ANSI_RESET} {ANSI_DIM}({model}){ANSI_RESET}");
        } else {
            println!("PyBot ({model})");
        }
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        self.erase_cursor();
        print!("{text}");
        self.flush();
    }

    fn print_reveal_frame(&mut self, frame: &str) {
        let (text, intermediate) = match frame.strip_suffix(REVEAL_CURSOR) {
            Some(text) => (text, true),
            None => (frame, false),
        };
        self.erase_cursor();
        if text.len() > self.revealed && text.is_char_boundary(self.revealed) {
            print!("{}", &text[self.revealed..]);
        }
        if intermediate {
            self.revealed = text.len();
            if self.use_color {
                print!("{ANSI_DIM}{REVEAL_CURSOR}{ANSI_RESET}");
            } else {
                print!("{REVEAL_CURSOR}");
            }
            self.cursor_shown = true;
        } else {
            self.revealed = 0;
        }
        self.flush();
    }

    fn print_prose(&mut self, line: &str) {
        self.erase_cursor();
        println!("{line}");
        println!();
        self.flush();
    }

    fn print_code_block(&mut self, block: &CodeBlock) {
        self.erase_cursor();
        let id = block.id();
        let index = block.index();
        if self.use_color {
            println!("{ANSI_CYAN}┌─ {id}{ANSI_RESET} {ANSI_DIM}(/copy {index}){ANSI_RESET}");
            for line in block.text().lines() {
                println!("{ANSI_CYAN}│{ANSI_RESET} {ANSI_YELLOW}{line}{ANSI_RESET}");
            }
            println!("{ANSI_CYAN}└─{ANSI_RESET}");
        } else {
            println!("[{id}] (/copy {index})");
            println!("{}", block.text());
            println!("[end {id}]");
        }
        println!();
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.erase_cursor();
        eprintln!("\nError: {error}");
    }

    fn print_info(&mut self, info: &str) {
        self.erase_cursor();
        println!("{info}");
        self.flush();
    }

    fn finish_response(&mut self) {
        self.erase_cursor();
        self.revealed = 0;
        println!();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.erase_cursor();
        println!("\n[interrupted]");
        self.flush();
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
