//! Provider identifiers and request types.

use std::time::Duration;

use gapfinder_core::GapFinderConfig;
use serde::{Deserialize, Serialize};

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    Gemini,
    OpenAI,
    Anthropic,
    Groq,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Groq => write!(f, "groq"),
        }
    }
}

/// One non-streaming completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    /// Ask the provider for a JSON body where it supports that.
    pub json: bool,
}

/// Limits shared by the batched LLM passes.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub paragraph_truncate: usize,
    pub retry_delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from(&GapFinderConfig::default())
    }
}

impl From<&GapFinderConfig> for BatchSettings {
    fn from(config: &GapFinderConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            paragraph_truncate: config.paragraph_truncate,
            retry_delay: config.retry_delay(),
        }
    }
}

/// First `max_chars` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("limitação", 8), "limitaçã");
        assert_eq!(truncate_chars("short", 300), "short");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_settings_from_config() {
        let settings = BatchSettings::default();
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.paragraph_truncate, 300);
        assert_eq!(settings.retry_delay, Duration::from_secs(40));
    }
}
