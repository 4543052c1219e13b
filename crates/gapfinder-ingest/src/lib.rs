//! GapFinder Ingest — page sources, paragraph continuity merging, candidate filters.

pub mod filters;
pub mod layout;
pub mod merge;
pub mod metadata;
pub mod pages;

pub use filters::{GapVocabulary, ScorabilityRules};
pub use layout::{LayoutMargins, LayoutPages, PageLayout, TextBlock};
pub use merge::{is_incomplete, join_fragments, ContinuityMerger};
pub use metadata::{content_hash, extract_doi, DocumentDigest};
pub use pages::{JsonlPages, TextPages};
