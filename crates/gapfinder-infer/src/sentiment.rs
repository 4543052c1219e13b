//! Lexicon-based sentiment polarity.
//!
//! Lexical mode sorts by this score in descending order, so the most
//! positive candidate comes first and negatively phrased gap statements
//! ("remains unclear", "has not been studied") sink towards the end.

use tracing::trace;

/// Produces a polarity in [-1, 1] for a piece of text.
pub trait SentimentBackend: Send + Sync {
    fn polarity(&self, text: &str) -> f32;
}

/// VADER compound score.
#[derive(Debug, Default, Clone, Copy)]
pub struct VaderSentiment;

impl VaderSentiment {
    pub fn new() -> Self {
        Self
    }
}

impl SentimentBackend for VaderSentiment {
    fn polarity(&self, text: &str) -> f32 {
        let analyzer = vader_sentiment::SentimentIntensityAnalyzer::new();
        let scores = analyzer.polarity_scores(text);
        let compound = scores.get("compound").copied().unwrap_or(0.0) as f32;
        trace!(compound, "vader polarity");
        compound.clamp(-1.0, 1.0)
    }
}
