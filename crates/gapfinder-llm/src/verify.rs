//! Batched verdicts with evidence grounding.
//!
//! Every candidate starts `uncertain`. A verdict only sticks when the model
//! cites a quote that occurs verbatim in the paragraph; anything else is
//! downgraded back to `uncertain`. Failed batches are skipped, never fatal.

use std::collections::HashMap;

use gapfinder_core::{notify, Progress, ScoredParagraph, VerifiedCandidate, Verdict};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::batch::{numbered_paragraphs, run_batch, BatchOutcome};
use crate::providers::LlmClient;
use crate::types::{BatchSettings, GenerationRequest};

pub const VERIFY_SYSTEM_PROMPT: &str = "\
You are a rigorous academic reviewer. Each paragraph below was flagged by an \
automatic model as a possible research gap. Classify every paragraph as one of:
- \"confirmed_gap\": the authors explicitly state a limitation, an unanswered \
question or an unexplored area that future work could address
- \"false_positive\": literature review, summary of findings, general statement \
or anything that is not a research gap
- \"uncertain\": not enough context to decide

For each paragraph return an object with \"index\", \"verdict\", \"reason\" \
(one sentence) and \"evidence_quote\": an exact, word-for-word excerpt copied \
from the paragraph that justifies the verdict. Never paraphrase the quote.

Return ONLY a JSON array of these objects.";

/// Reason recorded when a verdict's quote does not occur in the paragraph.
pub const UNGROUNDED_REASON: &str = "Evidence quote not found verbatim in the paragraph";

#[derive(Debug, Deserialize)]
struct VerdictEntry {
    index: usize,
    #[serde(default)]
    verdict: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    evidence_quote: String,
}

/// Classify candidates in batches. Never fails: unanswered candidates stay
/// `uncertain`.
pub async fn verify_gaps<C: LlmClient>(
    client: &C,
    candidates: Vec<ScoredParagraph>,
    settings: &BatchSettings,
    progress: Progress<'_>,
) -> Vec<VerifiedCandidate> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let batch_size = settings.batch_size.max(1);
    let total_batches = candidates.len().div_ceil(batch_size);
    let mut verified: Vec<VerifiedCandidate> =
        candidates.into_iter().map(VerifiedCandidate::pending).collect();
    let mut skipped = 0usize;

    for (n, batch) in verified.chunks_mut(batch_size).enumerate() {
        let offset = n * batch_size;
        notify(
            progress,
            &format!("Verifying batch {}/{} with the LLM...", n + 1, total_batches),
        );

        let paragraphs: Vec<ScoredParagraph> = batch.iter().map(|v| v.candidate.clone()).collect();
        let request = GenerationRequest {
            system: VERIFY_SYSTEM_PROMPT.to_string(),
            prompt: format!(
                "Classify each of these {} paragraphs. They were flagged by a semantic \
                 similarity model as potential research gaps.\n\n{}",
                paragraphs.len(),
                numbered_paragraphs(&paragraphs, settings.paragraph_truncate)
            ),
            temperature: 0.1,
            json: true,
        };

        let entries: Vec<VerdictEntry> =
            match run_batch(client, &request, settings, offset, progress).await {
                BatchOutcome::Answered(entries) => entries,
                BatchOutcome::Skipped(_) => {
                    skipped += 1;
                    continue;
                }
            };

        let by_index: HashMap<usize, VerdictEntry> =
            entries.into_iter().map(|e| (e.index, e)).collect();
        for (i, slot) in batch.iter_mut().enumerate() {
            match by_index.get(&i) {
                Some(entry) => apply_entry(slot, entry),
                None => debug!("No verdict for candidate {}", offset + i),
            }
        }
    }

    let confirmed = verified
        .iter()
        .filter(|v| v.verdict == Verdict::ConfirmedGap)
        .count();
    info!(
        "Verified {} candidates: {} confirmed, {} batches skipped",
        verified.len(),
        confirmed,
        skipped
    );
    verified
}

fn apply_entry(slot: &mut VerifiedCandidate, entry: &VerdictEntry) {
    slot.verdict = Verdict::from_label(&entry.verdict).unwrap_or(Verdict::Uncertain);
    slot.reason = entry.reason.trim().to_string();
    slot.evidence_quote = entry.evidence_quote.clone();

    if !is_grounded(&slot.candidate.paragraph, &entry.evidence_quote) {
        warn!(
            "Downgrading {} on page {}: quote not in paragraph",
            slot.verdict, slot.candidate.page
        );
        slot.verdict = Verdict::Uncertain;
        slot.reason = UNGROUNDED_REASON.to_string();
        slot.evidence_quote = String::new();
    }
}

/// True when `quote` is non-empty and occurs literally in `paragraph`.
pub fn is_grounded(paragraph: &str, quote: &str) -> bool {
    !quote.trim().is_empty() && paragraph.contains(quote)
}
