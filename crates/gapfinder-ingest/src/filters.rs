//! Candidate filters deciding which paragraphs are worth scoring.
//!
//! Two independent policies: a lexical whole-word match against the gap
//! vocabulary, and a scorability heuristic that rejects tables, tables of
//! contents and short fragments before the expensive semantic scorer.

use once_cell::sync::Lazy;
use regex::Regex;

use gapfinder_core::{Error, GapFinderConfig, Result};

/// Three or more dots in a row, or the single-glyph ellipsis.
static LEADER_DOTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{3,}|…").expect("static leader-dot pattern"));

/// Case-insensitive whole-word matcher over the gap vocabulary.
#[derive(Debug, Clone)]
pub struct GapVocabulary {
    pattern: Regex,
}

impl GapVocabulary {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self> {
        let mut terms: Vec<&str> = terms
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Err(Error::Config("gap vocabulary is empty".into()));
        }
        // Longest first so "research gap" is reported instead of "gap".
        terms.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));
        terms.dedup();

        let alternation = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
            .map_err(|e| Error::Config(format!("invalid gap vocabulary: {}", e)))?;

        Ok(Self { pattern })
    }

    pub fn from_config(config: &GapFinderConfig) -> Result<Self> {
        Self::new(&config.gap_vocabulary)
    }

    /// Whether the paragraph mentions any vocabulary term as a whole word.
    pub fn is_candidate(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Matched terms in order of appearance, lowercased and deduplicated.
    pub fn matched_terms(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for m in self.pattern.find_iter(text) {
            let term = m.as_str().to_lowercase();
            if !found.contains(&term) {
                found.push(term);
            }
        }
        found
    }
}

/// Prose-vs-junk admissibility thresholds.
#[derive(Debug, Clone, Copy)]
pub struct ScorabilityRules {
    pub min_chars: usize,
    pub min_alpha_ratio: f32,
}

impl Default for ScorabilityRules {
    fn default() -> Self {
        Self {
            min_chars: gapfinder_core::config::DEFAULT_MIN_PARAGRAPH_CHARS,
            min_alpha_ratio: gapfinder_core::config::DEFAULT_MIN_ALPHA_RATIO,
        }
    }
}

impl ScorabilityRules {
    pub fn from_config(config: &GapFinderConfig) -> Self {
        Self {
            min_chars: config.min_paragraph_chars,
            min_alpha_ratio: config.min_alpha_ratio,
        }
    }

    /// Whether the paragraph looks like real prose worth scoring.
    pub fn is_scorable(&self, text: &str) -> bool {
        let text = text.trim();
        if text.chars().count() < self.min_chars {
            return false;
        }
        if LEADER_DOTS.is_match(text) {
            return false;
        }
        alpha_ratio(text) >= self.min_alpha_ratio
    }
}

/// Alphabetic characters over non-whitespace characters.
fn alpha_ratio(text: &str) -> f32 {
    let mut visible = 0usize;
    let mut alphabetic = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        visible += 1;
        if c.is_alphabetic() {
            alphabetic += 1;
        }
    }
    if visible == 0 {
        return 0.0;
    }
    alphabetic as f32 / visible as f32
}
