//! Story markup handling: the boundary between whatever text a story arrives
//! with and the HTML the site renders as trusted.

pub mod document;
pub mod sanitize;

use coolstory_common::submission::{clamp_chars, read_time_minutes, word_count};

pub use document::Fragment;
pub use sanitize::{escape, sanitize};

/// Story content after sanitizing, plus what the site derives from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub html: String,
    pub text: String,
    pub words: usize,
}

impl Prepared {
    pub fn read_time(&self) -> u32 {
        read_time_minutes(self.words)
    }

    /// The first paragraph, falling back to the whole text, cut to `max`
    /// characters on a word boundary when possible.
    pub fn excerpt(&self, max: usize) -> String {
        let fragment = Fragment::from(self.html.as_str());
        let source = fragment
            .paragraphs()
            .into_iter()
            .next()
            .unwrap_or_else(|| self.text.clone());

        if source.chars().count() <= max {
            return source;
        }

        let cut = clamp_chars(&source, max.saturating_sub(1));
        let cut = match cut.rfind(' ') {
            Some(space) if space > 0 => &cut[..space],
            _ => cut,
        };

        format!("{}…", cut.trim_end())
    }
}

/// Sanitizes story content.
///
/// Text without any tags is treated as typed prose: blank lines separate
/// paragraphs and single newlines become line breaks.
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn prepare(input: &str) -> Prepared {
    let html = if looks_like_markup(input) {
        sanitize(input)
    } else {
        sanitize(&paragraphs_from_prose(input))
    };

    let text = Fragment::from(html.as_str()).text();
    let words = word_count(&text);

    tracing::debug!(words, "prepared story content");

    Prepared { html, text, words }
}

fn looks_like_markup(input: &str) -> bool {
    input
        .as_bytes()
        .windows(2)
        .any(|pair| pair[0] == b'<' && (pair[1].is_ascii_alphabetic() || pair[1] == b'/'))
}

fn paragraphs_from_prose(input: &str) -> String {
    let normalized = input.replace("\r\n", "\n");
    let mut out = String::with_capacity(normalized.len() + 16);

    for block in normalized.split("\n\n") {
        let lines = block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(escape)
            .collect::<Vec<_>>();

        if lines.is_empty() {
            continue;
        }

        out.push_str("<p>");
        out.push_str(&lines.join("<br>"));
        out.push_str("</p>");
    }

    out
}
