//! jpdb review export adapter.
//!
//! # Format
//! ```json
//! {
//!   "cards_vocabulary_jp_en": [
//!     { "vid": 1, "spelling": "水", "reading": "みず",
//!       "reviews": [{ "timestamp": 1700000000, "grade": "okay", "from_anki": false }] }
//!   ],
//!   "cards_vocabulary_en_jp": [],
//!   "cards_kanji_keyword_char": [{ "character": "水", "reviews": [] }],
//!   "cards_kanji_char_keyword": []
//! }
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::SourceAdapter;
use crate::error::{ExportError, Result};
use crate::types::{NormalizedCard, ReviewEvent};

const VOCABULARY_SECTIONS: [(&str, &str); 2] = [
    ("cards_vocabulary_jp_en", "vocabulary-jp-en"),
    ("cards_vocabulary_en_jp", "vocabulary-en-jp"),
];

const KANJI_SECTIONS: [(&str, &str); 2] = [
    ("cards_kanji_keyword_char", "kanji-keyword-char"),
    ("cards_kanji_char_keyword", "kanji-char-keyword"),
];

#[derive(Debug, Deserialize)]
struct JpdbReview {
    timestamp: i64,
    grade: String,
}

#[derive(Debug, Deserialize)]
struct VocabularyEntry {
    spelling: String,
    #[serde(default)]
    reviews: Vec<JpdbReview>,
}

#[derive(Debug, Deserialize)]
struct KanjiEntry {
    character: String,
    #[serde(default)]
    reviews: Vec<JpdbReview>,
}

/// Adapter for jpdb.io JSON exports.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpdbAdapter;

impl SourceAdapter for JpdbAdapter {
    fn name(&self) -> &'static str {
        "jpdb"
    }

    fn normalize(&self, raw: &Value) -> Result<Vec<NormalizedCard>> {
        let root = raw.as_object().ok_or(ExportError::NotAnObject)?;

        // Every section must be present before anything is produced.
        for (field, _) in VOCABULARY_SECTIONS.iter().chain(KANJI_SECTIONS.iter()) {
            if !root.get(*field).is_some_and(Value::is_array) {
                return Err(ExportError::MissingArray { field: *field });
            }
        }

        let mut cards = Vec::new();
        for (field, source) in VOCABULARY_SECTIONS {
            for (index, entry) in section(root, field).iter().enumerate() {
                let entry: VocabularyEntry = parse_entry(field, index, entry)?;
                push_card(&mut cards, entry.spelling, entry.reviews, source, field, index)?;
            }
        }
        for (field, source) in KANJI_SECTIONS {
            for (index, entry) in section(root, field).iter().enumerate() {
                let entry: KanjiEntry = parse_entry(field, index, entry)?;
                push_card(&mut cards, entry.character, entry.reviews, source, field, index)?;
            }
        }

        tracing::debug!(cards = cards.len(), "normalized jpdb export");
        Ok(cards)
    }
}

fn section<'a>(root: &'a serde_json::Map<String, Value>, field: &str) -> &'a [Value] {
    root.get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn parse_entry<T: for<'de> Deserialize<'de>>(
    field: &'static str,
    index: usize,
    entry: &Value,
) -> Result<T> {
    T::deserialize(entry).map_err(|e| ExportError::InvalidEntry {
        field,
        index,
        reason: e.to_string(),
    })
}

fn push_card(
    cards: &mut Vec<NormalizedCard>,
    term: String,
    reviews: Vec<JpdbReview>,
    source: &str,
    field: &'static str,
    index: usize,
) -> Result<()> {
    if reviews.is_empty() {
        return Ok(());
    }

    let reviews = reviews
        .into_iter()
        .map(|r| -> Result<ReviewEvent> {
            let timestamp = to_instant(r.timestamp).ok_or_else(|| ExportError::InvalidEntry {
                field,
                index,
                reason: format!("timestamp {} out of range", r.timestamp),
            })?;
            Ok(ReviewEvent::new(timestamp, r.grade, source))
        })
        .collect::<Result<Vec<_>>>()?;

    cards.push(NormalizedCard {
        search_term: term,
        reviews,
        source: source.to_string(),
    });
    Ok(())
}

/// 9999-12-31T23:59:59Z.
const LATEST_TIMESTAMP: i64 = 253_402_300_799;

/// Review timestamps are unix seconds between the epoch and the end of year 9999.
fn to_instant(secs: i64) -> Option<DateTime<Utc>> {
    if !(0..=LATEST_TIMESTAMP).contains(&secs) {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single()
}
