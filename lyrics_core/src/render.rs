//! Structural rendering of a variant buffer.
//!
//! `render` is a pure function of `(text, loading)` and is re-run on every
//! buffer update. While a stream is still arriving the raw text is shown
//! verbatim; partial `###` markers would otherwise mis-parse. Once the stream
//! settles the text goes through two passes: section segmentation on the
//! delimiter, then bracket segmentation inside each body.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const SECTION_DELIMITER: &str = "###";
pub const STREAMING_CURSOR: &str = "|";

const STRUCTURAL_MARKERS: &[&str] = &["HOOK", "INTRO", "OUTRO", "PONTE", "VERSO"];
const HIGHLIGHT_TERMS: &[&str] = &["TRAP HYPE 333", "LIFESTYLE E OURO", "OURO", "PLATINA"];
const WORD_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '(', ')', '"', '\'', '*'];

// Delimiter plus the letter/whitespace run that follows it.
static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)###\s*[A-Z\s]+").expect("section pattern"));
static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").expect("bracket pattern"));
static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+:[0-9]+)(\s*-\s*[0-9]+:[0-9]+)?$").expect("clock pattern"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedView {
    /// Loading with nothing received yet.
    Empty,
    Streaming { text: String, cursor: &'static str },
    Structured { sections: Vec<Section> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    Header { label: String },
    Body { parts: Vec<BodyPart> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyPart {
    Tag(TaggedToken),
    Text { tokens: Vec<WordToken> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedToken {
    /// The bracketed span as it appeared in the buffer.
    pub raw: String,
    /// Upper-cased `raw`, which is what gets displayed.
    pub display: String,
    pub kind: TagKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Timestamp,
    StructuralMarker,
    Highlight,
    Title,
    GenericPrompt,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WordToken {
    Space { text: String },
    /// Clickable word. `topic` is what a click generates for.
    Word { text: String, topic: String },
    /// Punctuation-only token, shown but not clickable.
    Plain { text: String },
}

pub fn render(text: &str, loading: bool) -> RenderedView {
    if loading {
        if text.is_empty() {
            return RenderedView::Empty;
        }
        return RenderedView::Streaming {
            text: text.to_string(),
            cursor: STREAMING_CURSOR,
        };
    }
    RenderedView::Structured {
        sections: parse_sections(text),
    }
}

pub fn parse_sections(text: &str) -> Vec<Section> {
    split_keep(&SECTION_RE, text)
        .into_iter()
        .map(|fragment| {
            if fragment.trim().starts_with(SECTION_DELIMITER) {
                Section::Header {
                    label: fragment.replace(SECTION_DELIMITER, "").trim().to_string(),
                }
            } else {
                Section::Body {
                    parts: parse_body(fragment),
                }
            }
        })
        .collect()
}

fn parse_body(section: &str) -> Vec<BodyPart> {
    split_keep(&BRACKET_RE, section)
        .into_iter()
        .map(|part| {
            let trimmed = part.trim();
            if trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']') {
                let inner = trimmed[1..trimmed.len() - 1].trim();
                BodyPart::Tag(TaggedToken {
                    raw: part.to_string(),
                    display: part.to_uppercase(),
                    kind: classify_tag(inner),
                })
            } else {
                BodyPart::Text {
                    tokens: tokenize_words(part),
                }
            }
        })
        .collect()
}

/// First match wins: clock time, structural marker, highlight, title, prompt.
pub fn classify_tag(text: &str) -> TagKind {
    let upper = text.to_uppercase();
    if CLOCK_RE.is_match(text) {
        TagKind::Timestamp
    } else if STRUCTURAL_MARKERS.iter().any(|m| upper.contains(m)) {
        TagKind::StructuralMarker
    } else if HIGHLIGHT_TERMS.iter().any(|t| upper.contains(t)) {
        TagKind::Highlight
    } else if text == upper && text.chars().count() > 3 {
        TagKind::Title
    } else {
        TagKind::GenericPrompt
    }
}

pub fn tokenize_words(text: &str) -> Vec<WordToken> {
    split_keep(&WHITESPACE_RE, text)
        .into_iter()
        .map(|token| {
            if token.chars().all(char::is_whitespace) {
                return WordToken::Space {
                    text: token.to_string(),
                };
            }
            let topic = word_topic(token);
            if topic.is_empty() {
                WordToken::Plain {
                    text: token.to_string(),
                }
            } else {
                WordToken::Word {
                    text: token.to_string(),
                    topic,
                }
            }
        })
        .collect()
}

/// Topic carried by a clicked word: the token without its punctuation.
pub fn word_topic(token: &str) -> String {
    token.chars().filter(|c| !WORD_PUNCTUATION.contains(c)).collect()
}

/// Split around every match of `re`, keeping the matches as their own
/// elements and dropping empty pieces.
fn split_keep<'a>(re: &Regex, text: &'a str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        if m.start() > last {
            out.push(&text[last..m.start()]);
        }
        if !m.as_str().is_empty() {
            out.push(m.as_str());
        }
        last = m.end();
    }
    if last < text.len() {
        out.push(&text[last..]);
    }
    out
}

impl RenderedView {
    /// Clickable words in display order.
    pub fn clickable_topics(&self) -> Vec<&str> {
        let RenderedView::Structured { sections } = self else {
            return Vec::new();
        };
        sections
            .iter()
            .filter_map(|s| match s {
                Section::Body { parts } => Some(parts),
                Section::Header { .. } => None,
            })
            .flatten()
            .filter_map(|p| match p {
                BodyPart::Text { tokens } => Some(tokens),
                BodyPart::Tag(_) => None,
            })
            .flatten()
            .filter_map(|t| match t {
                WordToken::Word { topic, .. } => Some(topic.as_str()),
                _ => None,
            })
            .collect()
    }
}
