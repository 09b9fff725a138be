//! Merging of stored and incoming review streams.

use crate::types::ReviewEvent;

/// Merge two review collections into one stream ordered by timestamp.
///
/// At equal timestamps `existing` entries come before `incoming` entries,
/// and each side keeps its own relative order. Duplicates are kept.
pub fn merge_reviews(existing: &[ReviewEvent], incoming: &[ReviewEvent]) -> Vec<ReviewEvent> {
    let mut merged: Vec<ReviewEvent> = existing.iter().chain(incoming).cloned().collect();
    // Stable sort keeps the existing-before-incoming concatenation order on ties.
    merged.sort_by_key(|event| event.timestamp);
    merged
}
