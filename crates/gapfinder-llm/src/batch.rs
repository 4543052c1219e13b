//! Shared batching for the per-candidate LLM passes.

use gapfinder_core::{Progress, ScoredParagraph};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::LlmError;
use crate::parse::parse_json_array;
use crate::providers::LlmClient;
use crate::retry::generate_with_retry;
use crate::types::{truncate_chars, BatchSettings, GenerationRequest};

/// Result of one batch round trip.
pub(crate) enum BatchOutcome<T> {
    Answered(Vec<T>),
    Skipped(LlmError),
}

/// `[i] (Score: 0.87)` headers followed by the truncated paragraph.
pub(crate) fn numbered_paragraphs(batch: &[ScoredParagraph], max_chars: usize) -> String {
    batch
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "[{}] (Score: {:.2})\n{}",
                i,
                c.score,
                truncate_chars(&c.paragraph, max_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub(crate) async fn run_batch<C, T>(
    client: &C,
    request: &GenerationRequest,
    settings: &BatchSettings,
    offset: usize,
    progress: Progress<'_>,
) -> BatchOutcome<T>
where
    C: LlmClient,
    T: DeserializeOwned,
{
    let answer = generate_with_retry(client, request, settings.retry_delay, progress)
        .await
        .and_then(|raw| parse_json_array::<T>(&raw));
    match answer {
        Ok(items) => BatchOutcome::Answered(items),
        Err(e) => {
            warn!("Batch at offset {} failed: {}", offset, e);
            BatchOutcome::Skipped(e)
        }
    }
}
