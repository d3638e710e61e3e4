//! Field extraction from a settled variant buffer.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::render::SECTION_DELIMITER;

pub const INSTRUMENTAL_CAPTION: &str = "PROMPT DE INSTRUMENTAL:";
pub const VOCAL_CAPTION: &str = "PROMPT DE VOZ:";

/// Minimum text length before any action is offered.
pub const MIN_ACTION_LEN: usize = 10;
/// Minimum text length before speech synthesis is offered.
pub const MIN_LISTEN_LEN: usize = 20;

static BEAT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^BEAT").expect("beat label"));
static LYRICS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^LETRA").expect("lyrics label"));
static VOICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^VOZ\s*(GIL\s*BV)?").expect("voice label"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedFields {
    pub beat: String,
    pub lyrics: String,
    pub voice_guide: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionAvailability {
    pub visible: bool,
    pub copy_lyrics: bool,
    pub copy_beat: bool,
    pub copy_voice: bool,
    pub copy_master: bool,
    pub listen: bool,
}

/// Splits on the delimiter and keeps labelled blocks. When a label repeats,
/// the last block carrying it replaces the earlier ones.
pub fn extract_fields(text: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::default();
    for block in text.split(SECTION_DELIMITER) {
        let trimmed = block.trim();
        if let Some(m) = BEAT_RE.find(trimmed) {
            fields.beat = trimmed[m.end()..].trim().to_string();
        } else if let Some(m) = LYRICS_RE.find(trimmed) {
            fields.lyrics = trimmed[m.end()..].trim().to_string();
        } else if let Some(m) = VOICE_RE.find(trimmed) {
            fields.voice_guide = trimmed[m.end()..].trim().to_string();
        }
    }
    fields
}

impl ExtractedFields {
    /// Instrumental prompt and vocal guide combined into one clipboard payload.
    pub fn master_prompt(&self) -> String {
        format!(
            "{INSTRUMENTAL_CAPTION}\n{}\n\n{VOCAL_CAPTION}\n{}",
            self.beat, self.voice_guide
        )
    }

    pub fn availability(&self, text: &str) -> ActionAvailability {
        let len = text.chars().count();
        ActionAvailability {
            visible: len >= MIN_ACTION_LEN,
            copy_lyrics: !self.lyrics.is_empty(),
            copy_beat: !self.beat.is_empty(),
            copy_voice: !self.voice_guide.is_empty(),
            copy_master: !self.beat.is_empty() || !self.voice_guide.is_empty(),
            listen: len >= MIN_LISTEN_LEN,
        }
    }
}
