//! Comment-only mode: one short relevance note per candidate.
//!
//! Unlike verification, a run where every batch fails is an error; the last
//! batch error is returned. Partial failure leaves empty comments.

use std::collections::HashMap;

use gapfinder_core::{notify, CommentedCandidate, Progress, ScoredParagraph};
use serde::Deserialize;
use tracing::{error, info};

use crate::batch::{numbered_paragraphs, run_batch, BatchOutcome};
use crate::error::LlmError;
use crate::providers::LlmClient;
use crate::types::{BatchSettings, GenerationRequest};

pub const COMMENT_SYSTEM_PROMPT: &str = "\
You are an academic research reviewer. For each paragraph, write a single short \
comment (1 sentence, max 20 words) assessing its relevance as a research gap.

Examples of good comments:
- \"Methodological limitation: small sample size limits generalization\"
- \"Identifies understudied geographic region in existing literature\"
- \"Literature review summary, not a gap; describes existing findings\"
- \"Suggests conflicting results that need further investigation\"
- \"General conclusion language, no specific research opportunity identified\"

Be concise and specific. Focus on what makes it a gap or why it is not one.
Return ONLY a JSON array of objects with \"index\" and \"comment\".";

#[derive(Debug, Deserialize)]
struct CommentEntry {
    index: usize,
    comment: String,
}

pub async fn annotate_gaps<C: LlmClient>(
    client: &C,
    candidates: Vec<ScoredParagraph>,
    settings: &BatchSettings,
    progress: Progress<'_>,
) -> Result<Vec<CommentedCandidate>, LlmError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = settings.batch_size.max(1);
    let total_batches = candidates.len().div_ceil(batch_size);
    let mut commented: Vec<CommentedCandidate> = candidates
        .into_iter()
        .map(|candidate| CommentedCandidate {
            candidate,
            comment: String::new(),
        })
        .collect();

    let mut failed = 0usize;
    let mut last_error = None;

    for (n, batch) in commented.chunks_mut(batch_size).enumerate() {
        notify(
            progress,
            &format!("Commenting batch {}/{} with the LLM...", n + 1, total_batches),
        );

        let paragraphs: Vec<ScoredParagraph> = batch.iter().map(|c| c.candidate.clone()).collect();
        let request = GenerationRequest {
            system: COMMENT_SYSTEM_PROMPT.to_string(),
            prompt: format!(
                "Comment on each of these {} paragraphs. They were flagged by a semantic \
                 similarity model as potential research gaps.\n\n{}",
                paragraphs.len(),
                numbered_paragraphs(&paragraphs, settings.paragraph_truncate)
            ),
            temperature: 0.1,
            json: true,
        };

        let entries: Vec<CommentEntry> =
            match run_batch(client, &request, settings, n * batch_size, progress).await {
                BatchOutcome::Answered(entries) => entries,
                BatchOutcome::Skipped(e) => {
                    failed += 1;
                    last_error = Some(e);
                    continue;
                }
            };

        let by_index: HashMap<usize, String> =
            entries.into_iter().map(|e| (e.index, e.comment)).collect();
        for (i, slot) in batch.iter_mut().enumerate() {
            if let Some(comment) = by_index.get(&i) {
                slot.comment = comment.trim().to_string();
            }
        }
    }

    if failed == total_batches {
        if let Some(e) = last_error {
            error!("All {} comment batches failed", total_batches);
            return Err(e);
        }
    }

    info!(
        "Commented {} candidates ({} of {} batches failed)",
        commented.len(),
        failed,
        total_batches
    );
    Ok(commented)
}
