//! Single-pass bookkeeping around a fallible page stream.

use gapfinder_core::{Error, PageRecord, Result};
use gapfinder_ingest::DocumentDigest;
use tracing::warn;

/// Fingerprints pages as the pipeline pulls them and latches the first
/// source error, which stops the stream.
#[derive(Default)]
pub struct DocumentRun {
    digest: DocumentDigest,
    failure: Option<Error>,
}

impl DocumentRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapt a fallible page source into the infallible stream the merger
    /// consumes. Check [`DocumentRun::finish`] afterwards.
    pub fn pages<'a, I>(&'a mut self, pages: I) -> impl Iterator<Item = PageRecord> + 'a
    where
        I: IntoIterator<Item = Result<PageRecord>>,
        I::IntoIter: 'a,
    {
        pages.into_iter().map_while(move |page| match page {
            Ok(page) => {
                self.digest.observe(&page);
                Some(page)
            }
            Err(e) => {
                warn!("Page source failed after {} pages: {}", self.digest.page_count(), e);
                self.failure = Some(e);
                None
            }
        })
    }

    /// The document digest, or the error that cut the stream short.
    pub fn finish(self) -> Result<DocumentDigest> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.digest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32) -> PageRecord {
        PageRecord {
            page_number: n,
            body_text: format!("Page {n}."),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_stream() {
        let mut run = DocumentRun::new();
        let pages: Vec<_> = run.pages(vec![Ok(page(1)), Ok(page(2))]).collect();
        assert_eq!(pages.len(), 2);
        let digest = run.finish().unwrap();
        assert_eq!(digest.page_count(), 2);
    }

    #[test]
    fn test_error_stops_stream_and_surfaces() {
        let mut run = DocumentRun::new();
        let source = vec![
            Ok(page(1)),
            Err(Error::Extraction("line 2: bad".into())),
            Ok(page(3)),
        ];
        let pages: Vec<_> = run.pages(source).collect();
        assert_eq!(pages.len(), 1);
        assert!(matches!(run.finish(), Err(Error::Extraction(_))));
    }
}
