use lyrics_core::{catalog, word_topic, Archetype, Rhythm, Variant};

use crate::error::ApiError;

/// Maximum topic length, in characters
const MAX_TOPIC_LENGTH: usize = 200;
/// Maximum length of a clicked word
const MAX_WORD_LENGTH: usize = 64;
/// Maximum text length for direct speech requests
const MAX_SPEECH_TEXT_LENGTH: usize = 20_000;

/// Validate a free-text topic and return it trimmed
pub fn validate_topic(topic: &str) -> Result<String, ApiError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(ApiError::InvalidInput("Topic cannot be empty".to_string()));
    }
    if topic.chars().count() > MAX_TOPIC_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Topic too long (max {} characters)",
            MAX_TOPIC_LENGTH
        )));
    }
    if topic.chars().any(|c| c.is_control() && c != '\n') {
        return Err(ApiError::InvalidInput(
            "Topic contains control characters".to_string(),
        ));
    }
    Ok(topic.to_string())
}

/// Validate a clicked word; the returned topic has its punctuation removed
pub fn validate_word(word: &str) -> Result<String, ApiError> {
    let word = word.trim();
    if word.chars().any(char::is_whitespace) {
        return Err(ApiError::InvalidInput(
            "Word must be a single token".to_string(),
        ));
    }
    if word.chars().count() > MAX_WORD_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Word too long (max {} characters)",
            MAX_WORD_LENGTH
        )));
    }
    let topic = word_topic(word);
    if topic.is_empty() {
        return Err(ApiError::InvalidInput("Word cannot be empty".to_string()));
    }
    Ok(topic)
}

/// Validate text for a direct speech request
pub fn validate_speech_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_SPEECH_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_SPEECH_TEXT_LENGTH
        )));
    }
    Ok(())
}

pub fn parse_variant(value: &str) -> Result<Variant, ApiError> {
    value.parse().map_err(ApiError::NotFound)
}

pub fn resolve_rhythm(name: Option<&str>) -> Result<Option<Rhythm>, ApiError> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        None => Ok(None),
        Some(name) => catalog::rhythm(name)
            .map(Some)
            .ok_or_else(|| ApiError::InvalidInput(format!("Unknown rhythm: {name}"))),
    }
}

pub fn resolve_archetype(name: &str) -> Result<Archetype, ApiError> {
    catalog::archetype(name.trim())
        .ok_or_else(|| ApiError::InvalidInput(format!("Unknown archetype: {name}")))
}
