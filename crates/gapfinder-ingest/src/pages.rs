//! Page sources: lazy, forward-only producers of `PageRecord`s.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use gapfinder_core::{Error, PageRecord, Result};
use tracing::debug;

use crate::merge::{split_paragraphs, PARAGRAPH_SEPARATOR};

/// Page break in plain-text extractions (`pdftotext` style).
pub const PAGE_SEPARATOR: char = '\u{000C}';

/// Plain text with form-feed page breaks and blank-line paragraph breaks.
///
/// Without positional information the first and last paragraphs stand in
/// for the visually-first and visually-last blocks.
pub struct TextPages {
    text: String,
    offset: usize,
    page_number: u32,
    done: bool,
}

impl TextPages {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offset: 0,
            page_number: 0,
            done: false,
        }
    }
}

impl Iterator for TextPages {
    type Item = PageRecord;

    fn next(&mut self) -> Option<PageRecord> {
        if self.done {
            return None;
        }
        let rest = &self.text[self.offset..];
        let (page_text, consumed) = match rest.find(PAGE_SEPARATOR) {
            Some(pos) => {
                let consumed = pos + PAGE_SEPARATOR.len_utf8();
                // pdftotext closes every page, the last one included, with a form feed.
                if rest[consumed..].trim().is_empty() {
                    self.done = true;
                }
                (&rest[..pos], consumed)
            }
            None => {
                self.done = true;
                (rest, rest.len())
            }
        };

        let fragments = split_paragraphs(page_text);
        self.page_number += 1;
        let record = PageRecord {
            page_number: self.page_number,
            body_text: fragments.join(PARAGRAPH_SEPARATOR),
            leading_block: fragments.first().cloned(),
            trailing_block: fragments.last().cloned(),
        };
        self.offset += consumed;
        Some(record)
    }
}

/// One JSON `PageRecord` per line, read lazily.
pub struct JsonlPages<R> {
    lines: std::io::Lines<R>,
    line_number: usize,
    last_page: Option<u32>,
}

impl JsonlPages<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Extraction(format!("cannot open {}: {}", path.display(), e))
        })?;
        debug!("Reading page records from {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonlPages<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            last_page: None,
        }
    }

    fn parse(&mut self, line: &str) -> Result<PageRecord> {
        let record: PageRecord = serde_json::from_str(line)
            .map_err(|e| Error::Extraction(format!("line {}: {}", self.line_number, e)))?;
        if record.page_number == 0 {
            return Err(Error::Extraction(format!(
                "line {}: page numbers are 1-based",
                self.line_number
            )));
        }
        if let Some(last) = self.last_page {
            if record.page_number <= last {
                return Err(Error::Extraction(format!(
                    "line {}: page {} does not follow page {}",
                    self.line_number, record.page_number, last
                )));
            }
        }
        self.last_page = Some(record.page_number);
        Ok(record)
    }
}

impl<R: BufRead> Iterator for JsonlPages<R> {
    type Item = Result<PageRecord>;

    fn next(&mut self) -> Option<Result<PageRecord>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(Error::Io(e))),
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.parse(&line));
        }
    }
}
