//! Response formatting.
//!
//! A raw reply is scanned line by line with a two-state machine:
//!
//! | state          | fence line                                   | any other line             |
//! |----------------|----------------------------------------------|----------------------------|
//! | `OutsideFence` | enter `InsideFence`; the marker line is dropped | emit prose + blank line |
//! | `InsideFence`  | flush the code block; back to `OutsideFence` | accumulate verbatim        |
//!
//! A fence line is any line whose trimmed text starts with [`FENCE_MARKER`];
//! a language tag after the marker is ignored.  If the reply ends inside a
//! fence the accumulated code is flushed as though the fence had closed.
//!
//! Code blocks are numbered `code-block-0`, `code-block-1`, ... in source
//! order, starting again from zero for every response, so formatting is
//! deterministic.  Nothing is escaped.

use std::fmt;

use crate::observability::{FORMAT_CODE_BLOCKS, FORMAT_RESPONSES, FORMAT_UNCLOSED_FENCES};

/// The line prefix that opens and closes a code region.
pub const FENCE_MARKER: &str = "```";

/// Prefix of every code block identifier.
pub const CODE_BLOCK_ID_PREFIX: &str = "code-block-";

// Shared by COPY_FEEDBACK_MS and COPY_SCRIPT; concat! only takes literals.
macro_rules! copy_feedback_ms {
    () => {
        2000
    };
}

/// Milliseconds the copy button shows its confirmation before reverting.
pub const COPY_FEEDBACK_MS: u64 = copy_feedback_ms!();

/// Script that backs the copy buttons in formatted markup.
///
/// `copyCode(id, button)` copies the text of element `id` to the clipboard,
/// relabels `button` to `Copied!` and restores it after [`COPY_FEEDBACK_MS`].
pub const COPY_SCRIPT: &str = concat!(
    r#"<script>
function copyCode(id, button) {
  const block = document.getElementById(id);
  if (!block) { return; }
  navigator.clipboard.writeText(block.innerText).then(() => {
    const label = button.innerText;
    button.innerText = 'Copied!';
    setTimeout(() => { button.innerText = label; }, "#,
    copy_feedback_ms!(),
    r#");
  });
}
</script>"#
);

/// A fenced code region of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    index: usize,
    text: String,
}

impl CodeBlock {
    fn new(index: usize, text: String) -> Self {
        Self { index, text }
    }

    /// Zero-based position among the response's code blocks.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The identifier the copy control is bound to, e.g. `code-block-0`.
    pub fn id(&self) -> String {
        format!("{CODE_BLOCK_ID_PREFIX}{}", self.index)
    }

    /// The code, with leading and trailing blank lines removed.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A piece of a formatted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// One line of prose.
    Prose(String),

    /// A fenced code region.
    Code(CodeBlock),
}

/// The result of formatting a reply: its segments and the markup built from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedResponse {
    segments: Vec<Segment>,
    markup: String,
}

impl FormattedResponse {
    /// The segments in source order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The code blocks in source order.
    pub fn code_blocks(&self) -> impl Iterator<Item = &CodeBlock> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Code(block) => Some(block),
            Segment::Prose(_) => None,
        })
    }

    /// The rendered markup.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Consume the response, keeping only the markup.
    pub fn into_markup(self) -> String {
        self.markup
    }
}

impl fmt::Display for FormattedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.markup)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    OutsideFence,
    InsideFence,
}

/// Returns true if `line` opens or closes a code region.
pub fn is_fence_line(line: &str) -> bool {
    line.trim().starts_with(FENCE_MARKER)
}

/// Format `raw` into markup; see [`format_response`].
pub fn format(raw: &str) -> String {
    format_response(raw).into_markup()
}

/// Split `raw` into prose and code segments and render them as markup.
pub fn format_response(raw: &str) -> FormattedResponse {
    let mut segments = Vec::new();
    let mut state = FenceState::OutsideFence;
    let mut code = String::new();
    let mut next_index = 0;

    for line in raw.lines() {
        state = match (state, is_fence_line(line)) {
            (FenceState::OutsideFence, true) => FenceState::InsideFence,
            (FenceState::OutsideFence, false) => {
                segments.push(Segment::Prose(line.to_string()));
                FenceState::OutsideFence
            }
            (FenceState::InsideFence, true) => {
                segments.push(Segment::Code(CodeBlock::new(
                    next_index,
                    trim_blank_lines(&code).to_string(),
                )));
                next_index += 1;
                code.clear();
                FenceState::OutsideFence
            }
            (FenceState::InsideFence, false) => {
                code.push_str(line);
                code.push('\n');
                FenceState::InsideFence
            }
        };
    }
    if state == FenceState::InsideFence {
        FORMAT_UNCLOSED_FENCES.click();
        segments.push(Segment::Code(CodeBlock::new(
            next_index,
            trim_blank_lines(&code).to_string(),
        )));
        next_index += 1;
    }

    FORMAT_RESPONSES.click();
    FORMAT_CODE_BLOCKS.count(next_index as u64);

    let markup = render_markup(&segments);
    FormattedResponse { segments, markup }
}

/// Render segments as markup: prose lines become paragraphs, code blocks
/// become a `<pre>` tagged with the block id followed by a copy button.
pub fn render_markup(segments: &[Segment]) -> String {
    let mut markup = String::new();
    for segment in segments {
        match segment {
            Segment::Prose(line) => {
                markup.push_str(line);
                markup.push_str("\n\n");
            }
            Segment::Code(block) => {
                let id = block.id();
                markup.push_str(&format!(
                    "<div class=\"code-block\"><pre id=\"{id}\"><code>{}</code></pre>\
                     <button class=\"copy-button\" onclick=\"copyCode('{id}', this)\">Copy</button></div>\n\n",
                    block.text()
                ));
            }
        }
    }
    markup
}

/// Remove whitespace-only lines from both ends of `code`.
///
/// Everything between the first and last non-blank line is kept exactly,
/// including the indentation of the first line.
fn trim_blank_lines(code: &str) -> &str {
    let mut start = None;
    let mut end = 0;
    let mut offset = 0;
    for line in code.split_inclusive('\n') {
        if !line.trim().is_empty() {
            start.get_or_insert(offset);
            end = offset + line.trim_end_matches(['\n', '\r']).len();
        }
        offset += line.len();
    }
    match start {
        Some(start) => &code[start..end],
        None => "",
    }
}
