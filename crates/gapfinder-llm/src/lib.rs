//! GapFinder LLM — verification, annotation and reports via external LLMs.
//!
//! Calls go to hosted APIs (Gemini/OpenAI/Anthropic/Groq); no local model is
//! required. All passes are generic over [`LlmClient`].

mod batch;
pub mod comment;
pub mod config;
pub mod error;
pub mod parse;
pub mod providers;
pub mod report;
pub mod retry;
pub mod types;
pub mod verify;

#[cfg(test)]
mod testing;

pub use comment::annotate_gaps;
pub use config::LLMConfig;
pub use error::LlmError;
pub use providers::{HttpLlmClient, LlmClient};
pub use report::{generate_comment_report, generate_report, NO_CONFIRMED_GAPS_REPORT};
pub use retry::{generate_with_retry, parse_retry_delay};
pub use types::*;
pub use verify::{is_grounded, verify_gaps, UNGROUNDED_REASON};
