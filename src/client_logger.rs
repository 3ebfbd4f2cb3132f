//! Logging trait for chat-completion client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all API interactions passing through the [`ChatClient`], and
//! [`JsonLinesLogger`], which appends one JSON record per interaction to a file.
//!
//! [`ChatClient`]: crate::ChatClient

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde_json::json;

use crate::error::{Error, Result};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

/// A trait for logging chat-completion client operations.
///
/// # Example
///
/// ```rust,ignore
/// use pybot::{ChatCompletionRequest, ChatCompletionResponse, ClientLogger, Error};
///
/// struct StderrLogger;
///
/// impl ClientLogger for StderrLogger {
///     fn log_request(&self, request: &ChatCompletionRequest) {
///         eprintln!("-> {}", request.model);
///     }
///
///     fn log_response(&self, response: &ChatCompletionResponse) {
///         eprintln!("<- {}", response.reply_text());
///     }
///
///     fn log_failure(&self, error: &Error) {
///         eprintln!("!! {error}");
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, request: &ChatCompletionRequest);

    /// Log a response whose payload was recognized.
    fn log_response(&self, response: &ChatCompletionResponse);

    /// Log any failure, including unrecognized payloads.
    fn log_failure(&self, error: &Error);
}

/// A [`ClientLogger`] that appends JSON lines to a file.
///
/// Each line is an object with an `event` field (`request`, `response` or
/// `failure`) and the event's data.  Write errors are ignored so that logging
/// never interferes with a conversation.
pub struct JsonLinesLogger {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesLogger {
    /// Open (or create) `path` for appending.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open client log", err))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_record(&self, record: serde_json::Value) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        let _ = serde_json::to_writer(&mut *writer, &record);
        let _ = writer.write_all(b"\n");
        let _ = writer.flush();
    }
}

impl ClientLogger for JsonLinesLogger {
    fn log_request(&self, request: &ChatCompletionRequest) {
        self.write_record(json!({"event": "request", "request": request}));
    }

    fn log_response(&self, response: &ChatCompletionResponse) {
        self.write_record(json!({"event": "response", "response": response}));
    }

    fn log_failure(&self, error: &Error) {
        self.write_record(json!({
            "event": "failure",
            "kind": error.kind().as_str(),
            "error": error.to_string(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Model;

    #[test]
    fn json_lines_logger_appends_records() {
        let path = std::env::temp_dir().join(format!(
            "pybot-client-log-{}.jsonl",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let logger = JsonLinesLogger::open(&path).unwrap();
        logger.log_request(&ChatCompletionRequest::single_turn(
            "sys",
            "hello",
            Model::Gemma7bIt,
        ));
        logger.log_failure(&Error::unexpected_payload("{}"));
        drop(logger);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "request");
        assert_eq!(lines[0]["request"]["model"], "gemma-7b-it");
        assert_eq!(lines[1]["event"], "failure");
        assert_eq!(lines[1]["kind"], "format");

        let _ = std::fs::remove_file(&path);
    }
}
