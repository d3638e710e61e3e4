//! Turning a full variant buffer into the text sent to the speech backend.

use std::sync::LazyLock;

use regex::Regex;

/// Backend input limit, in characters.
pub const MAX_SPEECH_CHARS: usize = 800;

const DELIMITER: &str = "###";

static LYRICS_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)###\s*LETRA\s*").expect("lyrics label pattern"));
static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").expect("bracket pattern"));
static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").expect("paren pattern"));

/// The lyrics block: everything after the lyrics label up to the next
/// delimiter. Without a label, the text before the first delimiter.
pub fn isolate_lyrics(text: &str) -> &str {
    let tail = match LYRICS_LABEL_RE.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    };
    tail.split(DELIMITER).next().unwrap_or_default()
}

/// Drops `[...]` and `(...)` annotations and trims.
pub fn strip_annotations(block: &str) -> String {
    let without_brackets = BRACKET_RE.replace_all(block, "");
    PAREN_RE.replace_all(&without_brackets, "").trim().to_string()
}

/// Lyrics ready for synthesis, or `None` when nothing speakable is left.
pub fn prepare_lyrics(text: &str) -> Option<String> {
    let cleaned = strip_annotations(isolate_lyrics(text));
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.chars().take(MAX_SPEECH_CHARS).collect())
}

pub fn request_text(lyrics: &str) -> String {
    format!("Letra: {lyrics}")
}
