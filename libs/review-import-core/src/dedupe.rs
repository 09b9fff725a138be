//! Collapsing of records that resolve to the same item.

use std::collections::HashMap;

use crate::types::{ItemType, UpsertRecord};

/// Records left after deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct Deduplicated {
    pub kept: Vec<UpsertRecord>,
    pub discarded: usize,
}

/// Keep one record per (key, type): the one with the greatest stability.
///
/// Ties go to the first record seen. Groups keep first-appearance order.
pub fn dedupe(records: Vec<UpsertRecord>) -> Deduplicated {
    let total = records.len();
    let mut slots: HashMap<(String, ItemType), usize> = HashMap::with_capacity(total);
    let mut kept: Vec<UpsertRecord> = Vec::with_capacity(total);

    for record in records {
        let (key, item_type) = record.identity();
        let identity = (key.to_string(), item_type);
        match slots.get(&identity) {
            Some(&slot) => {
                // Strict comparison keeps the earlier record on ties (and on NaN).
                if record.card.stability > kept[slot].card.stability {
                    kept[slot] = record;
                }
            }
            None => {
                slots.insert(identity, kept.len());
                kept.push(record);
            }
        }
    }

    let discarded = total - kept.len();
    if discarded > 0 {
        tracing::debug!(discarded, kept = kept.len(), "removed duplicate records");
    }

    Deduplicated { kept, discarded }
}
