//! Error types for GapFinder.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Scoring requested before any candidates exist")]
    NoCandidates,

    #[error("Invalid scoring mode: {0}")]
    InvalidMode(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
