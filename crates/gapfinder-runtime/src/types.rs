//! Runtime types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use gapfinder_core::{CommentedCandidate, Error, ScoredParagraph, VerifiedCandidate};
use gapfinder_ingest::DocumentDigest;
use serde::Serialize;
use uuid::Uuid;

/// How candidates are selected and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Gap vocabulary filter, scored by sentiment polarity.
    Lexical,
    /// Scorability filter, scored by similarity to the anchor phrases.
    Semantic,
}

impl FromStr for ScoringMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "sentiment" => Ok(Self::Lexical),
            "semantic" => Ok(Self::Semantic),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

/// Analysis verb requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    /// Lexical scan with sentiment scores.
    Scan,
    /// Semantic ranking.
    Rank,
    /// Semantic ranking followed by LLM verification.
    Verify,
    /// Semantic ranking followed by LLM comments.
    Annotate,
}

impl Verb {
    pub fn scoring_mode(self) -> ScoringMode {
        match self {
            Verb::Scan => ScoringMode::Lexical,
            Verb::Rank | Verb::Verify | Verb::Annotate => ScoringMode::Semantic,
        }
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scan" => Ok(Self::Scan),
            "rank" => Ok(Self::Rank),
            "verify" => Ok(Self::Verify),
            "annotate" => Ok(Self::Annotate),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

/// Results of one run, shaped by the verb.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunResults {
    Scored(Vec<ScoredParagraph>),
    Verified(Vec<VerifiedCandidate>),
    Commented(Vec<CommentedCandidate>),
}

impl RunResults {
    pub fn len(&self) -> usize {
        match self {
            RunResults::Scored(v) => v.len(),
            RunResults::Verified(v) => v.len(),
            RunResults::Commented(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-document result envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub source: String,
    pub content_hash: String,
    pub pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    pub mode: Verb,
    pub generated_at: DateTime<Utc>,
    pub results: RunResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

impl RunSummary {
    pub fn new(
        source: impl Into<String>,
        digest: &DocumentDigest,
        mode: Verb,
        results: RunResults,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source: source.into(),
            content_hash: digest.content_hash(),
            pages: digest.page_count(),
            doi: digest.doi().map(str::to_string),
            mode,
            generated_at: Utc::now(),
            results,
            report: None,
        }
    }

    pub fn with_report(mut self, report: String) -> Self {
        self.report = Some(report);
        self
    }
}
