use thiserror::Error;

/// Failure of a single LLM round trip.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP 429 or a provider "resource exhausted" answer; `detail` carries
    /// the provider text, including any suggested wait.
    #[error("Rate limited: {detail}")]
    RateLimited { detail: String },

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unparsable response: {0}")]
    Parse(String),

    #[error("No LLM provider configured")]
    NotConfigured,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Request(e.to_string())
    }
}

impl From<LlmError> for gapfinder_core::Error {
    fn from(e: LlmError) -> Self {
        gapfinder_core::Error::Llm(e.to_string())
    }
}
