//! Records that flow through a pipeline run.

use serde::{Deserialize, Serialize};

/// One PDF page after layout extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based, increasing across the document.
    pub page_number: u32,
    /// Paragraph blocks joined with a blank line, left column before right.
    #[serde(default)]
    pub body_text: String,
    /// Block with the smallest vertical coordinate.
    #[serde(default)]
    pub leading_block: Option<String>,
    /// Block with the largest vertical coordinate.
    #[serde(default)]
    pub trailing_block: Option<String>,
}

/// A unit of analysis after cross-page merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub page: u32,
    pub text: String,
}

/// A paragraph that passed the filter, with its score.
///
/// Sentiment scores lie in [-1, 1], similarity scores in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredParagraph {
    pub page: u32,
    pub paragraph: String,
    pub score: f32,
}

impl ScoredParagraph {
    pub fn new(paragraph: Paragraph, score: f32) -> Self {
        Self {
            page: paragraph.page,
            paragraph: paragraph.text,
            score,
        }
    }
}

/// LLM classification of a candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    ConfirmedGap,
    FalsePositive,
    #[default]
    Uncertain,
}

impl Verdict {
    /// Parse the wire label. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "confirmed_gap" => Some(Self::ConfirmedGap),
            "false_positive" => Some(Self::FalsePositive),
            "uncertain" => Some(Self::Uncertain),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfirmedGap => write!(f, "confirmed_gap"),
            Self::FalsePositive => write!(f, "false_positive"),
            Self::Uncertain => write!(f, "uncertain"),
        }
    }
}

/// A candidate after verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedCandidate {
    #[serde(flatten)]
    pub candidate: ScoredParagraph,
    pub verdict: Verdict,
    pub reason: String,
    pub evidence_quote: String,
}

impl VerifiedCandidate {
    /// Default state before (or without) a usable LLM answer.
    pub fn pending(candidate: ScoredParagraph) -> Self {
        Self {
            candidate,
            verdict: Verdict::Uncertain,
            reason: String::new(),
            evidence_quote: String::new(),
        }
    }
}

/// A candidate with a one-line relevance comment (comment-only mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentedCandidate {
    #[serde(flatten)]
    pub candidate: ScoredParagraph,
    pub comment: String,
}

/// Bibliographic hints for the report prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub doi: Option<String>,
}

/// Optional observer for human-readable progress messages.
pub type Progress<'a> = Option<&'a (dyn Fn(&str) + Sync)>;

/// Invoke the observer if present.
pub fn notify(progress: Progress<'_>, message: &str) {
    if let Some(callback) = progress {
        callback(message);
    }
}
