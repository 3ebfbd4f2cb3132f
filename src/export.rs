//! HTML export of a transcript.
//!
//! Formatted replies are already markup and are inserted as-is; everything
//! else is escaped and shown preformatted.  The page carries the copy script
//! so that the code block buttons work when opened in a browser.

use std::fmt::Write;

use crate::format::COPY_SCRIPT;
use crate::transcript::Transcript;
use crate::types::{Message, MessageRole};

const PAGE_STYLE: &str = r#"<style>
body { font-family: sans-serif; max-width: 60rem; margin: 2rem auto; }
.chat-message { padding: 1rem 1.5rem; border-radius: 0.5rem; margin-bottom: 1rem; white-space: pre-wrap; }
.chat-message.user { background-color: #2b313e; color: #fff; }
.chat-message.bot { background-color: #475063; color: #fff; }
.chat-message .meta { font-size: 0.8rem; opacity: 0.7; margin-bottom: 0.5rem; }
.code-block pre { background-color: #1e1e1e; padding: 0.75rem; overflow-x: auto; }
.copy-button { margin-top: 0.25rem; }
</style>"#;

/// Render `transcript` as a standalone HTML page.
pub fn render_transcript_html(transcript: &Transcript, title: &str) -> String {
    let title = html_escape::encode_text(title);
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(page, "<title>{title}</title>");
    page.push_str(PAGE_STYLE);
    page.push_str("\n</head>\n<body>\n");
    let _ = writeln!(page, "<h1>{title}</h1>");
    for message in transcript {
        render_message(&mut page, message);
    }
    page.push_str(COPY_SCRIPT);
    page.push_str("\n</body>\n</html>\n");
    page
}

fn render_message(page: &mut String, message: &Message) {
    let class = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "bot",
    };
    let _ = writeln!(page, "<div class=\"chat-message {class}\">");
    match message.model {
        Some(model) => {
            let _ = writeln!(
                page,
                "<div class=\"meta\">{} ({model})</div>",
                message.role.as_str()
            );
        }
        None => {
            let _ = writeln!(page, "<div class=\"meta\">{}</div>", message.role.as_str());
        }
    }
    if message.rendered_as_html {
        page.push_str(&message.content);
    } else {
        let _ = write!(
            page,
            "<pre>{}</pre>",
            html_escape::encode_text(&message.content)
        );
    }
    page.push_str("\n</div>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format;
    use crate::types::Model;

    #[test]
    fn export_escapes_plain_messages_and_keeps_markup() {
        let mut transcript = Transcript::new();
        transcript.append(MessageRole::User, "is a < b?");
        transcript.append_message(
            Message::assistant(format("Yes:\n```\nprint(1 < 2)\n```"))
                .with_html(true)
                .with_model(Some(Model::Mixtral8x7b32768)),
        );

        let page = render_transcript_html(&transcript, "PyBot & friends");
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>PyBot &amp; friends</title>"));
        assert!(page.contains("<pre>is a &lt; b?</pre>"));
        assert!(page.contains("<pre id=\"code-block-0\"><code>print(1 < 2)</code></pre>"));
        assert!(page.contains("assistant (mixtral-8x7b-32768)"));
        assert!(page.contains("function copyCode(id, button)"));
        assert_eq!(page.matches("class=\"chat-message ").count(), 2);
    }

    #[test]
    fn empty_transcript_still_renders_a_page() {
        let page = render_transcript_html(&Transcript::new(), "PyBot");
        assert!(page.contains("<h1>PyBot</h1>"));
        assert!(!page.contains("chat-message user"));
    }
}
