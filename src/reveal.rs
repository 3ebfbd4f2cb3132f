//! Progressive display of an already complete reply.
//!
//! The reply is not streamed from the API; a [`RevealStrategy`] re-emits a
//! growing prefix of it so the terminal shows the answer "being typed".
//! Strategies are swappable so a streaming transport can replace the
//! simulation without touching the formatter.

use std::time::Duration;

use crate::observability::REVEAL_TOKENS;

/// Marker appended to every intermediate frame.
pub const REVEAL_CURSOR: &str = "▌";

/// Pause between two words.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(50);

/// A way of showing a complete reply progressively.
#[async_trait::async_trait]
pub trait RevealStrategy: Send + Sync {
    /// Show `full_text` through `emit` and return the text that was finally shown.
    ///
    /// Each call to `emit` receives the whole frame to display, not a delta.
    /// The last call never carries [`REVEAL_CURSOR`].  Reveal always runs to
    /// completion once started.
    async fn reveal(
        &self,
        full_text: &str,
        emit: &mut (dyn for<'f> FnMut(&'f str) + Send),
    ) -> String;
}

/// Reveals one whitespace-separated word at a time with a fixed delay.
///
/// Runs of whitespace collapse into single spaces, so line breaks and
/// indentation of the original reply do not survive.  For `W` words `emit`
/// is called `W` times with a trailing cursor and once more without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordReveal {
    delay: Duration,
}

impl WordReveal {
    /// Creates a word reveal with the given per-word delay.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// The per-word delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for WordReveal {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_DELAY)
    }
}

#[async_trait::async_trait]
impl RevealStrategy for WordReveal {
    async fn reveal(
        &self,
        full_text: &str,
        emit: &mut (dyn for<'f> FnMut(&'f str) + Send),
    ) -> String {
        let mut accumulator = String::with_capacity(full_text.len() + 1);
        for word in full_text.split_whitespace() {
            accumulator.push_str(word);
            accumulator.push(' ');
            emit(&format!("{accumulator}{REVEAL_CURSOR}"));
            REVEAL_TOKENS.click();
            tokio::time::sleep(self.delay).await;
        }
        let shown = accumulator.trim_end().to_string();
        emit(&shown);
        shown
    }
}

/// Shows the reply at once, unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstantReveal;

#[async_trait::async_trait]
impl RevealStrategy for InstantReveal {
    async fn reveal(
        &self,
        full_text: &str,
        emit: &mut (dyn for<'f> FnMut(&'f str) + Send),
    ) -> String {
        emit(full_text);
        full_text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect_frames(strategy: &dyn RevealStrategy, text: &str) -> (Vec<String>, String) {
        let mut frames = Vec::new();
        let shown = strategy
            .reveal(text, &mut |frame: &str| frames.push(frame.to_string()))
            .await;
        (frames, shown)
    }

    #[tokio::test(start_paused = true)]
    async fn word_reveal_frames() {
        let (frames, shown) = collect_frames(&WordReveal::default(), "use   a\nlist  ").await;
        assert_eq!(
            frames,
            vec![
                "use ▌".to_string(),
                "use a ▌".to_string(),
                "use a list ▌".to_string(),
                "use a list".to_string(),
            ]
        );
        assert_eq!(shown, "use a list");
    }

    #[tokio::test(start_paused = true)]
    async fn word_reveal_cursor_count_matches_word_count() {
        let text = "def f(x):\n    return x * 2\n\nprint(f(3))";
        let words: Vec<&str> = text.split_whitespace().collect();
        let (frames, shown) = collect_frames(&WordReveal::default(), text).await;
        let with_cursor = frames.iter().filter(|f| f.ends_with(REVEAL_CURSOR)).count();
        assert_eq!(with_cursor, words.len());
        assert_eq!(frames.len(), words.len() + 1);
        assert!(!frames.last().unwrap().ends_with(REVEAL_CURSOR));
        assert_eq!(shown, words.join(" "));
    }

    #[tokio::test(start_paused = true)]
    async fn word_reveal_waits_per_word() {
        let delay = Duration::from_millis(50);
        let start = tokio::time::Instant::now();
        let _ = collect_frames(&WordReveal::new(delay), "one two three four").await;
        assert_eq!(start.elapsed(), delay * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn word_reveal_of_blank_text_emits_only_final_frame() {
        let (frames, shown) = collect_frames(&WordReveal::default(), " \n\t").await;
        assert_eq!(frames, vec![String::new()]);
        assert_eq!(shown, "");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_word_reveal_keeps_word_framing() {
        let text = "for x in xs:\n    print(x)";
        let start = tokio::time::Instant::now();
        let (frames, shown) = collect_frames(&WordReveal::new(Duration::ZERO), text).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0], "for ▌");
        assert_eq!(shown, "for x in xs: print(x)");
        assert_eq!(frames.last().unwrap(), &shown);
    }

    #[tokio::test]
    async fn instant_reveal_is_lossless() {
        let text = "line one\n\n    indented";
        let (frames, shown) = collect_frames(&InstantReveal, text).await;
        assert_eq!(frames, vec![text.to_string()]);
        assert_eq!(shown, text);
    }
}
