//! The session transcript.

use std::slice;

use crate::types::{Message, MessageRole};

/// Ordered, append-only record of the messages exchanged in one session.
///
/// Messages are never validated or edited once appended; the only way to
/// remove them is [`Transcript::clear`], which discards everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plain-text message.
    pub fn append(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    /// Appends a fully built message.
    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in the order they were appended.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Discards every message.  There is no undo.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Iterates over the messages in order.
    pub fn iter(&self) -> slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Model;

    #[test]
    fn append_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.append(MessageRole::User, "first");
        transcript.append(MessageRole::Assistant, "second");
        transcript.append(MessageRole::Assistant, "third");

        let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last().unwrap().content, "third");
    }

    #[test]
    fn no_validation_on_append() {
        let mut transcript = Transcript::new();
        transcript.append(MessageRole::Assistant, "");
        transcript.append(MessageRole::Assistant, "");
        assert_eq!(transcript.len(), 2);
        assert!(transcript.all().iter().all(|m| !m.rendered_as_html));
    }

    #[test]
    fn append_message_keeps_metadata() {
        let mut transcript = Transcript::new();
        transcript.append_message(
            Message::assistant("<div/>")
                .with_html(true)
                .with_model(Some(Model::Gemma7bIt)),
        );
        let message = transcript.last().unwrap();
        assert!(message.rendered_as_html);
        assert_eq!(message.model, Some(Model::Gemma7bIt));
    }

    #[test]
    fn clear_discards_everything() {
        let mut transcript = Transcript::new();
        transcript.append(MessageRole::User, "q");
        transcript.append(MessageRole::Assistant, "a");
        transcript.clear();
        assert!(transcript.is_empty());
        assert!(transcript.last().is_none());
        assert_eq!((&transcript).into_iter().count(), 0);
    }
}
