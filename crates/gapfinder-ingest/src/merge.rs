//! Cross-page paragraph reconstruction.
//!
//! A naive per-page split truncates any paragraph that runs over a page
//! break. [`ContinuityMerger`] walks the page stream once, keeps the
//! visually-last block of a page when it looks unfinished, and stitches it
//! to the visually-first block of the next page.

use std::collections::VecDeque;

use gapfinder_core::{PageRecord, Paragraph};
use tracing::debug;

/// Separator between paragraph blocks inside `PageRecord::body_text`.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Normalised characters compared when matching a block against a fragment.
const MATCH_PREFIX_CHARS: usize = 100;

const TERMINAL_CHARS: &[char] = &['.', '!', '?', '"', ')', ']'];

/// True when the fragment does not end like a finished sentence and so
/// probably continues on the next page.
pub fn is_incomplete(text: &str) -> bool {
    match text.trim_end().chars().last() {
        Some(last) => !TERMINAL_CHARS.contains(&last),
        None => false,
    }
}

/// Join two fragments that straddle a page break, repairing hyphenation.
pub fn join_fragments(first: &str, second: &str) -> String {
    let first = first.trim_end();
    let second = second.trim_start();
    match first.strip_suffix('-') {
        Some(stem) => format!("{}{}", stem, second),
        None => format!("{} {}", first, second),
    }
}

/// Split page text into trimmed, non-empty paragraph fragments.
pub fn split_paragraphs(body: &str) -> Vec<String> {
    body.split(PARAGRAPH_SEPARATOR)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a block and a fragment come from the same underlying text block.
///
/// The leading/trailing blocks and the body are produced by separate layout
/// passes, so whitespace and extraction order may differ slightly.
pub fn same_fragment(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let a_head: String = a.chars().take(MATCH_PREFIX_CHARS).collect();
    let b_head: String = b.chars().take(MATCH_PREFIX_CHARS).collect();
    a_head.starts_with(&b_head) || b_head.starts_with(&a_head)
}

/// A fragment waiting for its continuation on the next page.
#[derive(Debug, Clone)]
struct Pending {
    page: u32,
    text: String,
    /// Earliest page whose own fragment qualifies on its own.
    qualified_page: Option<u32>,
}

/// Pull-based merger over a single-pass page stream.
///
/// Holds the current page's fragments and at most one pending fragment.
/// `qualifies` is the candidate predicate used only to decide page
/// attribution of a stitched paragraph: the earliest page whose fragment
/// alone already qualifies wins, otherwise the page that completes it.
pub struct ContinuityMerger<I, F> {
    pages: I,
    qualifies: F,
    pending: Option<Pending>,
    ready: VecDeque<Paragraph>,
    exhausted: bool,
}

impl<I, F> ContinuityMerger<I, F>
where
    I: Iterator<Item = PageRecord>,
    F: Fn(&str) -> bool,
{
    pub fn new<P>(pages: P, qualifies: F) -> Self
    where
        P: IntoIterator<IntoIter = I>,
    {
        Self {
            pages: pages.into_iter(),
            qualifies,
            pending: None,
            ready: VecDeque::new(),
            exhausted: false,
        }
    }

    fn process_page(&mut self, page: PageRecord) {
        let fragments = split_paragraphs(&page.body_text);
        let leading = non_empty(page.leading_block.as_deref());
        let trailing_incomplete =
            non_empty(page.trailing_block.as_deref()).filter(|t| is_incomplete(t));

        let mut consumed_leading: Option<&str> = None;
        let mut carry: Option<Pending> = None;

        if let Some(pending) = self.pending.take() {
            match leading {
                Some(lead) => {
                    let joined = join_fragments(&pending.text, lead);
                    consumed_leading = Some(lead);

                    if trailing_incomplete.is_some_and(|t| same_fragment(t, lead)) {
                        // The continuation runs on past this page as well.
                        debug!(
                            "Carrying paragraph from page {} across page {}",
                            pending.page, page.page_number
                        );
                        let qualified_page = pending.qualified_page.or_else(|| {
                            (self.qualifies)(lead).then_some(page.page_number)
                        });
                        carry = Some(Pending {
                            page: pending.page,
                            text: joined,
                            qualified_page,
                        });
                    } else {
                        let attributed = pending.qualified_page.unwrap_or(page.page_number);
                        debug!(
                            "Joined paragraph across pages {}-{} (attributed to {})",
                            pending.page, page.page_number, attributed
                        );
                        self.ready.push_back(Paragraph {
                            page: attributed,
                            text: joined,
                        });
                    }
                }
                None => {
                    self.ready.push_back(Paragraph {
                        page: pending.page,
                        text: pending.text,
                    });
                }
            }
        }

        let mut skipped_leading = false;
        let mut deferred_trailing = false;
        for fragment in fragments {
            if !skipped_leading && consumed_leading.is_some_and(|l| same_fragment(&fragment, l)) {
                skipped_leading = true;
                continue;
            }
            if !deferred_trailing && trailing_incomplete.is_some_and(|t| same_fragment(&fragment, t))
            {
                deferred_trailing = true;
                continue;
            }
            self.ready.push_back(Paragraph {
                page: page.page_number,
                text: fragment,
            });
        }

        self.pending = match carry {
            Some(carried) => Some(carried),
            None => trailing_incomplete.map(|t| Pending {
                page: page.page_number,
                text: t.to_string(),
                qualified_page: (self.qualifies)(t).then_some(page.page_number),
            }),
        };
    }
}

impl<I, F> Iterator for ContinuityMerger<I, F>
where
    I: Iterator<Item = PageRecord>,
    F: Fn(&str) -> bool,
{
    type Item = Paragraph;

    fn next(&mut self) -> Option<Paragraph> {
        loop {
            if let Some(paragraph) = self.ready.pop_front() {
                return Some(paragraph);
            }
            if self.exhausted {
                return None;
            }
            match self.pages.next() {
                Some(page) => self.process_page(page),
                None => {
                    self.exhausted = true;
                    if let Some(pending) = self.pending.take() {
                        return Some(Paragraph {
                            page: pending.page,
                            text: pending.text,
                        });
                    }
                }
            }
        }
    }
}

fn non_empty(block: Option<&str>) -> Option<&str> {
    block.map(str::trim).filter(|b| !b.is_empty())
}
