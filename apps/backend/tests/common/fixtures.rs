//! Test fixtures and factory functions for creating test data.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use review_import_core::{CardState, ExistingCard, ItemType, NormalizedCard, ReviewEvent, ReviewMode};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Build a review stream from (unix seconds, grade) pairs.
pub fn reviews(spec: &[(i64, &str)], source: &str) -> Vec<ReviewEvent> {
    spec.iter()
        .map(|(secs, grade)| ReviewEvent::new(at(*secs), *grade, source))
        .collect()
}

pub fn card(term: &str, source: &str, spec: &[(i64, &str)]) -> NormalizedCard {
    NormalizedCard {
        search_term: term.to_string(),
        reviews: reviews(spec, source),
        source: source.to_string(),
    }
}

/// A stored card with the given history, state taken from a fresh card.
pub fn existing(key: &str, item_type: ItemType, history: Vec<ReviewEvent>) -> ExistingCard {
    ExistingCard {
        key: key.to_string(),
        item_type,
        card: CardState::new_at(at(0)),
        mode: ReviewMode::Kana,
        lesson_id: Some("lesson-7".to_string()),
        history,
    }
}

/// Minimal jpdb export with one vocabulary and one kanji card.
pub fn jpdb_export() -> Value {
    json!({
        "cards_vocabulary_jp_en": [
            { "vid": 1, "spelling": "水", "reading": "みず",
              "reviews": [
                  { "timestamp": 100, "grade": "okay", "from_anki": false },
                  { "timestamp": 200, "grade": "nothing", "from_anki": false },
                  { "timestamp": 300, "grade": "easy", "from_anki": false }
              ] }
        ],
        "cards_vocabulary_en_jp": [],
        "cards_kanji_keyword_char": [
            { "character": "木", "reviews": [{ "timestamp": 400, "grade": "hard" }] }
        ],
        "cards_kanji_char_keyword": []
    })
}
