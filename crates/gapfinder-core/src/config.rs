//! Pipeline configuration: vocabulary, anchor bank, thresholds and LLM limits.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Terms whose whole-word presence makes a paragraph a lexical candidate.
pub const DEFAULT_GAP_KEYWORDS: &[&str] = &[
    "limitation",
    "limitação",
    "research gap",
    "lacuna",
    "gap",
    "shortage",
    "insufficiency",
    "lack",
    "deficiency",
    "inadequacy",
    "unexplored",
    "under-researched",
    "insufficiently studied",
    "neglected",
    "unexamined",
    "sparse",
    "incomplete",
    "under-theorized",
    "unaddressed",
    "overlooked",
    "underestimated",
    "uncharted",
    "knowledge gap",
];

/// Exemplar sentences of an author stating a research gap.
pub const DEFAULT_ANCHOR_PHRASES: &[&str] = &[
    "Few studies have examined this relationship, leaving an important gap in the literature.",
    "This question remains largely unexplored and warrants further investigation.",
    "A key limitation of this study is the small sample size, which restricts generalization.",
    "Future research should investigate whether these findings hold in other contexts.",
    "To our knowledge, no prior work has addressed this problem directly.",
    "The mechanisms underlying this effect are still poorly understood.",
    "Existing approaches fail to account for these factors, and more work is needed.",
    "Empirical evidence on this topic remains scarce and inconclusive.",
    "Further studies are needed to clarify the conflicting results reported so far.",
    "Há uma lacuna na literatura sobre este tema que precisa ser investigada.",
];

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;
pub const DEFAULT_TOP_K: usize = 20;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_PARAGRAPH_TRUNCATE: usize = 300;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 40;
pub const DEFAULT_MIN_PARAGRAPH_CHARS: usize = 80;
pub const DEFAULT_MIN_ALPHA_RATIO: f32 = 0.6;

/// Every tunable of a pipeline run. Components receive this by reference;
/// none of them read the environment themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapFinderConfig {
    #[serde(default = "default_vocabulary")]
    pub gap_vocabulary: Vec<String>,
    #[serde(default = "default_anchors")]
    pub anchor_phrases: Vec<String>,
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Candidates per LLM request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Characters of each paragraph sent to the LLM.
    #[serde(default = "default_truncate")]
    pub paragraph_truncate: usize,
    /// Fallback wait before the single rate-limit retry.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_min_chars")]
    pub min_paragraph_chars: usize,
    #[serde(default = "default_min_alpha_ratio")]
    pub min_alpha_ratio: f32,
}

fn default_vocabulary() -> Vec<String> {
    DEFAULT_GAP_KEYWORDS.iter().map(|s| s.to_string()).collect()
}
fn default_anchors() -> Vec<String> {
    DEFAULT_ANCHOR_PHRASES.iter().map(|s| s.to_string()).collect()
}
fn default_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_truncate() -> usize {
    DEFAULT_PARAGRAPH_TRUNCATE
}
fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}
fn default_min_chars() -> usize {
    DEFAULT_MIN_PARAGRAPH_CHARS
}
fn default_min_alpha_ratio() -> f32 {
    DEFAULT_MIN_ALPHA_RATIO
}

impl Default for GapFinderConfig {
    fn default() -> Self {
        Self {
            gap_vocabulary: default_vocabulary(),
            anchor_phrases: default_anchors(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            batch_size: DEFAULT_BATCH_SIZE,
            paragraph_truncate: DEFAULT_PARAGRAPH_TRUNCATE,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            min_paragraph_chars: DEFAULT_MIN_PARAGRAPH_CHARS,
            min_alpha_ratio: DEFAULT_MIN_ALPHA_RATIO,
        }
    }
}

impl GapFinderConfig {
    /// Load from an optional JSON file, apply env overrides, then validate.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                info!("Loaded config from {}", path.display());
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override numeric knobs from `GAPFINDER_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse::<f32>("GAPFINDER_THRESHOLD") {
            self.similarity_threshold = v;
        }
        if let Some(v) = env_parse::<usize>("GAPFINDER_TOP_K") {
            self.top_k = v;
        }
        if let Some(v) = env_parse::<usize>("GAPFINDER_BATCH_SIZE") {
            self.batch_size = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gap_vocabulary.iter().all(|t| t.trim().is_empty()) {
            return Err(Error::Config("gap_vocabulary must not be empty".into()));
        }
        if self.anchor_phrases.iter().all(|t| t.trim().is_empty()) {
            return Err(Error::Config("anchor_phrases must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if self.paragraph_truncate == 0 {
            return Err(Error::Config("paragraph_truncate must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.min_alpha_ratio) {
            return Err(Error::Config(format!(
                "min_alpha_ratio must be within [0, 1], got {}",
                self.min_alpha_ratio
            )));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            debug!("Ignoring unparsable {}={:?}", key, raw);
            None
        }
    }
}
