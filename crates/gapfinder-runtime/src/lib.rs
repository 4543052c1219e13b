//! GapFinder runtime — drives a document through the gap-finding pipeline.
//!
//! Provides the verbs (scan, rank, verify, annotate), the ranker and the
//! per-document run summary.

pub mod pipeline;
pub mod rank;
pub mod source;
pub mod types;

pub use pipeline::GapPipeline;
pub use source::DocumentRun;
pub use types::*;
