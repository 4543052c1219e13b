//! Pipeline — page stream → merged paragraphs → candidates → scores → ranking.
//!
//! Everything runs on the calling task in one forward pass over the pages.
//! The LLM stages are async, take any [`LlmClient`] and only ever see the
//! ranking of a document whose page source finished cleanly.

use gapfinder_core::{
    notify, CommentedCandidate, Error, GapFinderConfig, PageRecord, Paragraph, Progress, Result,
    ScoredParagraph, VerifiedCandidate,
};
use gapfinder_infer::{SemanticScorer, SentimentBackend};
use gapfinder_ingest::{ContinuityMerger, DocumentDigest, GapVocabulary, ScorabilityRules};
use gapfinder_llm::{annotate_gaps, verify_gaps, BatchSettings, LlmClient};
use tracing::{debug, info};

use crate::rank::{select_lexical, select_semantic};
use crate::source::DocumentRun;
use crate::types::ScoringMode;

/// A configured gap-finding pipeline. Scorers are attached explicitly; a
/// mode whose scorer is missing fails with [`Error::InvalidMode`].
pub struct GapPipeline {
    config: GapFinderConfig,
    vocabulary: GapVocabulary,
    scorability: ScorabilityRules,
    sentiment: Option<Box<dyn SentimentBackend>>,
    semantic: Option<SemanticScorer>,
}

impl GapPipeline {
    pub fn new(config: GapFinderConfig) -> Result<Self> {
        config.validate()?;
        let vocabulary = GapVocabulary::from_config(&config)?;
        let scorability = ScorabilityRules::from_config(&config);
        info!(
            "Pipeline ready: {} vocabulary terms, threshold={}, top_k={}",
            config.gap_vocabulary.len(),
            config.similarity_threshold,
            config.top_k
        );
        Ok(Self {
            config,
            vocabulary,
            scorability,
            sentiment: None,
            semantic: None,
        })
    }

    pub fn with_sentiment(mut self, backend: Box<dyn SentimentBackend>) -> Self {
        self.sentiment = Some(backend);
        self
    }

    pub fn with_semantic(mut self, scorer: SemanticScorer) -> Self {
        self.semantic = Some(scorer);
        self
    }

    pub fn config(&self) -> &GapFinderConfig {
        &self.config
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings::from(&self.config)
    }

    /// Score and select candidates in the given mode.
    pub fn run<I>(
        &self,
        mode: ScoringMode,
        pages: I,
        progress: Progress<'_>,
    ) -> Result<Vec<ScoredParagraph>>
    where
        I: IntoIterator<Item = PageRecord>,
    {
        match mode {
            ScoringMode::Lexical => self.scan(pages, progress),
            ScoringMode::Semantic => self.rank(pages, progress),
        }
    }

    /// Drain a fallible page source through [`GapPipeline::run`].
    ///
    /// A source failure fails the whole document, so a truncated ranking
    /// never reaches the LLM stages.
    pub fn run_document<I>(
        &self,
        mode: ScoringMode,
        source: I,
        progress: Progress<'_>,
    ) -> Result<(Vec<ScoredParagraph>, DocumentDigest)>
    where
        I: IntoIterator<Item = Result<PageRecord>>,
    {
        let mut document = DocumentRun::new();
        let ranked = self.run(mode, document.pages(source), progress)?;
        let digest = document.finish()?;
        info!(
            "Document of {} pages yielded {} candidates",
            digest.page_count(),
            ranked.len()
        );
        Ok((ranked, digest))
    }

    /// Lexical mode: vocabulary hits scored by sentiment polarity, all kept.
    pub fn scan<I>(&self, pages: I, progress: Progress<'_>) -> Result<Vec<ScoredParagraph>>
    where
        I: IntoIterator<Item = PageRecord>,
    {
        let sentiment = self
            .sentiment
            .as_deref()
            .ok_or_else(|| Error::InvalidMode("lexical mode needs a sentiment backend".into()))?;

        notify(progress, "Scanning paragraphs for gap vocabulary...");
        let merger = ContinuityMerger::new(pages, |text: &str| self.vocabulary.is_candidate(text));

        let mut total = 0usize;
        let mut hits = Vec::new();
        for paragraph in merger {
            total += 1;
            if !self.vocabulary.is_candidate(&paragraph.text) {
                continue;
            }
            debug!(
                "Page {} candidate, terms: {:?}",
                paragraph.page,
                self.vocabulary.matched_terms(&paragraph.text)
            );
            let score = sentiment.polarity(&paragraph.text);
            hits.push(ScoredParagraph::new(paragraph, score));
        }

        info!("Lexical scan: {} of {} paragraphs matched", hits.len(), total);
        Ok(select_lexical(hits))
    }

    /// Semantic mode: scorable paragraphs ranked by anchor similarity, then
    /// thresholded and truncated to top-K.
    pub fn rank<I>(&self, pages: I, progress: Progress<'_>) -> Result<Vec<ScoredParagraph>>
    where
        I: IntoIterator<Item = PageRecord>,
    {
        let scorer = self
            .semantic
            .as_ref()
            .ok_or_else(|| Error::InvalidMode("semantic mode needs an embedding model".into()))?;

        let merger = ContinuityMerger::new(pages, |text: &str| self.scorability.is_scorable(text));
        let mut total = 0usize;
        let candidates: Vec<Paragraph> = merger
            .inspect(|_| total += 1)
            .filter(|p| self.scorability.is_scorable(&p.text))
            .collect();
        info!("Semantic scan: {} of {} paragraphs scorable", candidates.len(), total);

        if candidates.is_empty() {
            notify(progress, "No scorable paragraphs found.");
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = candidates.iter().map(|p| p.text.as_str()).collect();
        let scores = scorer.score(&texts, progress)?;
        let scored: Vec<ScoredParagraph> = candidates
            .into_iter()
            .zip(scores)
            .map(|(paragraph, score)| ScoredParagraph::new(paragraph, score))
            .collect();

        let selected = select_semantic(
            scored,
            self.config.similarity_threshold,
            self.config.top_k,
        );
        info!(
            "Selected {} candidates (threshold={}, top_k={})",
            selected.len(),
            self.config.similarity_threshold,
            self.config.top_k
        );
        Ok(selected)
    }

    /// Batched LLM verdicts over an existing ranking. Never fails; skipped
    /// batches stay `uncertain`.
    pub async fn verify<C: LlmClient>(
        &self,
        client: &C,
        ranked: Vec<ScoredParagraph>,
        progress: Progress<'_>,
    ) -> Vec<VerifiedCandidate> {
        verify_gaps(client, ranked, &self.batch_settings(), progress).await
    }

    /// One LLM comment per ranked candidate.
    pub async fn annotate<C: LlmClient>(
        &self,
        client: &C,
        ranked: Vec<ScoredParagraph>,
        progress: Progress<'_>,
    ) -> Result<Vec<CommentedCandidate>> {
        let commented = annotate_gaps(client, ranked, &self.batch_settings(), progress).await?;
        Ok(commented)
    }
}
