//! Single bounded retry on provider rate limits.

use std::time::Duration;

use gapfinder_core::{notify, Progress};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::error::LlmError;
use crate::providers::LlmClient;
use crate::types::GenerationRequest;

static RETRY_IN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)retry in (\d+)").expect("static retry pattern"));

/// Wait suggested by the provider's error text, or `default`.
pub fn parse_retry_delay(detail: &str, default: Duration) -> Duration {
    RETRY_IN
        .captures(detail)
        .and_then(|c| c[1].parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Call the client; on a rate limit wait once and try exactly one more time.
///
/// Any failure of the second attempt is returned as-is.
pub async fn generate_with_retry<C: LlmClient>(
    client: &C,
    request: &GenerationRequest,
    default_delay: Duration,
    progress: Progress<'_>,
) -> Result<String, LlmError> {
    match client.generate(request).await {
        Err(LlmError::RateLimited { detail }) => {
            let wait = parse_retry_delay(&detail, default_delay);
            warn!("Rate limited, retrying in {}s", wait.as_secs());
            notify(
                progress,
                &format!("Rate limited by the LLM provider. Retrying in {}s...", wait.as_secs()),
            );
            tokio::time::sleep(wait).await;
            let result = client.generate(request).await;
            if result.is_ok() {
                info!("Retry after rate limit succeeded");
            }
            result
        }
        other => other,
    }
}
