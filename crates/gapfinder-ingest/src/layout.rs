//! Column-aware page assembly from positioned text blocks.
//!
//! Whatever renders the PDF hands over one `PageLayout` per page; this module
//! drops header/footer bands, reads the left column before the right one and
//! picks the visually-first and visually-last blocks for continuation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use gapfinder_core::{Error, PageRecord, Result};

use crate::merge::PARAGRAPH_SEPARATOR;

/// Height in points of the header and footer bands (~0.8 inch).
pub const DEFAULT_MARGIN: f32 = 60.0;

/// A text block with its bounding box, origin at the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub text: String,
}

/// All text blocks of one page plus its dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<TextBlock>,
}

#[derive(Debug, Clone, Copy)]
pub struct LayoutMargins {
    pub header: f32,
    pub footer: f32,
}

impl Default for LayoutMargins {
    fn default() -> Self {
        Self {
            header: DEFAULT_MARGIN,
            footer: DEFAULT_MARGIN,
        }
    }
}

/// Build the page record for one laid-out page.
pub fn page_record(page_number: u32, layout: &PageLayout, margins: LayoutMargins) -> PageRecord {
    let header_limit = margins.header;
    let footer_limit = layout.height - margins.footer;
    let midpoint = layout.width / 2.0;

    // Blocks entirely inside a band are running heads, folios or footnotes.
    let body: Vec<&TextBlock> = layout
        .blocks
        .iter()
        .filter(|b| !b.text.trim().is_empty())
        .filter(|b| !(b.y1 < header_limit || b.y0 > footer_limit))
        .collect();

    if body.is_empty() {
        return PageRecord {
            page_number,
            ..Default::default()
        };
    }

    let (mut left, mut right): (Vec<&TextBlock>, Vec<&TextBlock>) = body
        .iter()
        .copied()
        .partition(|b| (b.x0 + b.x1) / 2.0 < midpoint);
    left.sort_by(|a, b| a.y0.total_cmp(&b.y0));
    right.sort_by(|a, b| a.y0.total_cmp(&b.y0));

    let body_text = left
        .iter()
        .chain(right.iter())
        .map(|b| b.text.trim())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_SEPARATOR);

    // Stable sort: on equal y0 the earlier block in extraction order leads.
    let mut by_y = body;
    by_y.sort_by(|a, b| a.y0.total_cmp(&b.y0));
    let leading_block = by_y.first().map(|b| b.text.trim().to_string());
    let trailing_block = by_y.last().map(|b| b.text.trim().to_string());

    PageRecord {
        page_number,
        body_text,
        leading_block,
        trailing_block,
    }
}

/// One JSON `PageLayout` per line, assembled into page records numbered
/// from 1. Blank lines are skipped without consuming a page number.
pub struct LayoutPages<R> {
    lines: std::io::Lines<R>,
    margins: LayoutMargins,
    line_number: usize,
    page_number: u32,
}

impl LayoutPages<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Extraction(format!("cannot open {}: {}", path.display(), e))
        })?;
        debug!("Reading page layouts from {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LayoutPages<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            margins: LayoutMargins::default(),
            line_number: 0,
            page_number: 0,
        }
    }

    pub fn with_margins(mut self, margins: LayoutMargins) -> Self {
        self.margins = margins;
        self
    }
}

impl<R: BufRead> Iterator for LayoutPages<R> {
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
            let layout: PageLayout = match serde_json::from_str(&line) {
                Ok(layout) => layout,
                Err(e) => {
                    return Some(Err(Error::Extraction(format!(
                        "line {}: {}",
                        self.line_number, e
                    ))))
                }
            };
            self.page_number += 1;
            return Some(Ok(page_record(self.page_number, &layout, self.margins)));
        }
    }
}
