//! Document-level metadata: DOI lookup and content fingerprint.

use gapfinder_core::PageRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static DOI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+").expect("static DOI pattern")
});

/// First DOI found in the text, if any.
pub fn extract_doi(text: &str) -> Option<String> {
    DOI_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// Compute SHA-256 content hash.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Incremental fingerprint of a page stream, fed one page at a time.
///
/// The hash covers the concatenated `body_text` of every page, so it equals
/// `content_hash` over the joined text.
#[derive(Clone, Default)]
pub struct DocumentDigest {
    hasher: Sha256,
    doi: Option<String>,
    pages: usize,
}

impl DocumentDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, page: &PageRecord) {
        self.hasher.update(page.body_text.as_bytes());
        if self.doi.is_none() {
            self.doi = extract_doi(&page.body_text);
        }
        self.pages += 1;
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    pub fn content_hash(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }
}
