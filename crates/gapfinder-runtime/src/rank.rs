//! Ranking and selection of scored candidates.

use gapfinder_core::ScoredParagraph;

/// Stable descending sort: equal scores keep document order.
pub fn sort_descending(items: &mut [ScoredParagraph]) {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Lexical selection: every hit, best first.
pub fn select_lexical(mut items: Vec<ScoredParagraph>) -> Vec<ScoredParagraph> {
    sort_descending(&mut items);
    items
}

/// Semantic selection: scores at or above `threshold`, best first, at most `top_k`.
pub fn select_semantic(
    mut items: Vec<ScoredParagraph>,
    threshold: f32,
    top_k: usize,
) -> Vec<ScoredParagraph> {
    items.retain(|c| c.score >= threshold);
    sort_descending(&mut items);
    items.truncate(top_k);
    items
}
