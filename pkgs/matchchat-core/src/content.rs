//! Message display text and link handling.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::MessageContent;

fn anchor_href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<a\b[^>]*\bhref\s*=\s*["']([^"']+)["']"#).unwrap()
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:https?://|www\.)[^\s<>"']+"#).unwrap())
}

impl MessageContent {
    /// Canonical display string for this content.
    ///
    /// Total: every variant yields a string, the worst case being empty.
    pub fn display_text(&self) -> String {
        match self {
            MessageContent::Text { text } => text.clone(),
            MessageContent::Html { html } => html_to_text(html),
            MessageContent::Entities { urls } => urls.join(" "),
            MessageContent::Blocks { texts } => texts.join(" "),
            MessageContent::Opaque { value } => {
                let mut found = Vec::new();
                collect_strings(value, &mut found);
                found.join(" ")
            }
        }
    }
}

/// Anchor hrefs joined with spaces when the markup contains any, otherwise
/// the tag-stripped text. Links outrank surrounding prose.
fn html_to_text(html: &str) -> String {
    let links: Vec<&str> = anchor_href_re()
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    if !links.is_empty() {
        return links.join(" ");
    }

    let stripped = tag_re().replace_all(html, " ");
    let unescaped = unescape_entities(&stripped);
    whitespace_re()
        .replace_all(unescaped.trim(), " ")
        .into_owned()
}

fn unescape_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_strings(item, out);
            }
        }
        _ => {}
    }
}

/// One presentation segment of a normalized message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text")]
pub enum TextSegment {
    Plain(String),
    Link(String),
}

/// Split a normalized string into literal text and clickable-link segments.
///
/// The input is not modified; `http(s)://` and `www.`-prefixed tokens become
/// [`TextSegment::Link`], everything between them [`TextSegment::Plain`].
pub fn linkify(text: &str) -> Vec<TextSegment> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for found in url_re().find_iter(text) {
        if found.start() > cursor {
            segments.push(TextSegment::Plain(text[cursor..found.start()].to_string()));
        }
        segments.push(TextSegment::Link(found.as_str().to_string()));
        cursor = found.end();
    }
    if cursor < text.len() {
        segments.push(TextSegment::Plain(text[cursor..].to_string()));
    }
    segments
}
