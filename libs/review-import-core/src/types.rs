//! Core types for the review import pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scheduling phase of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingState {
    New,
    Learning,
    Review,
    Relearning,
}

impl Default for SchedulingState {
    fn default() -> Self {
        Self::New
    }
}

impl SchedulingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Relearning => "relearning",
        }
    }

    /// Parse from the stored string form. Unknown values fall back to `New`.
    pub fn parse(s: &str) -> Self {
        match s {
            "learning" => Self::Learning,
            "review" => Self::Review,
            "relearning" => Self::Relearning,
            _ => Self::New,
        }
    }
}

/// Standard grading outcome understood by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// Convert to 4-point numeric value (1-4).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }
}

/// Instruction that bypasses rating-based scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    /// No state change, no log.
    Ignore,
    /// Reset the card through the scheduler's forget operation.
    Forget,
    /// Mark the card permanently known and stop replaying.
    NeverForget,
}

/// Result of mapping an external grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GradeOutcome {
    Rating(Rating),
    Control(ControlAction),
}

/// Rating recorded in a simulation log. `Manual` marks scheduler resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogRating {
    Manual,
    Again,
    Hard,
    Good,
    Easy,
}

impl From<Rating> for LogRating {
    fn from(rating: Rating) -> Self {
        match rating {
            Rating::Again => Self::Again,
            Rating::Hard => Self::Hard,
            Rating::Good => Self::Good,
            Rating::Easy => Self::Easy,
        }
    }
}

impl LogRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }
}

/// A single review taken from a vendor export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub timestamp: DateTime<Utc>,
    /// Vendor grade string, mapped by [`crate::grade::map_grade`].
    pub grade: String,
    pub source: String,
}

impl ReviewEvent {
    pub fn new(timestamp: DateTime<Utc>, grade: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            timestamp,
            grade: grade.into(),
            source: source.into(),
        }
    }
}

/// Per-item memory state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    /// May be `f64::INFINITY` for never-forget cards.
    pub stability: f64,
    pub difficulty: f64,
    pub due: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
    pub state: SchedulingState,
    pub elapsed_days: f64,
    pub scheduled_days: f64,
    pub reps: u32,
    pub lapses: u32,
}

impl CardState {
    /// A card that has never been reviewed, due at `created_at`.
    pub fn new_at(created_at: DateTime<Utc>) -> Self {
        Self {
            stability: 0.0,
            difficulty: 0.0,
            due: created_at,
            last_review: None,
            state: SchedulingState::New,
            elapsed_days: 0.0,
            scheduled_days: 0.0,
            reps: 0,
            lapses: 0,
        }
    }

    pub fn is_never_forget(&self) -> bool {
        self.stability == f64::INFINITY
    }
}

/// Record of one applied transition. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationLog {
    pub previous_state: SchedulingState,
    pub new_state: SchedulingState,
    pub rating: LogRating,
    pub reviewed_at: DateTime<Utc>,
    pub stability: f64,
    pub difficulty: f64,
    pub due: DateTime<Utc>,
}

/// Kind of practice item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Vocabulary,
    Kanji,
    Radical,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vocabulary => "vocabulary",
            Self::Kanji => "kanji",
            Self::Radical => "radical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vocabulary" => Some(Self::Vocabulary),
            "kanji" => Some(Self::Kanji),
            "radical" => Some(Self::Radical),
            _ => None,
        }
    }
}

/// Resolved internal identity of a search term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalItem {
    pub key: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

impl CanonicalItem {
    pub fn new(key: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            key: key.into(),
            item_type,
        }
    }
}

/// Which side of the item is being studied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    Readings,
    Kana,
}

impl Default for ReviewMode {
    fn default() -> Self {
        Self::Readings
    }
}

impl ReviewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Readings => "readings",
            Self::Kana => "kana",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "kana" => Self::Kana,
            _ => Self::Readings,
        }
    }
}

/// One card as produced by a source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCard {
    pub search_term: String,
    pub reviews: Vec<ReviewEvent>,
    /// Source type within the export (e.g. `vocabulary-jp-en`).
    pub source: String,
}

/// Card state already held by the store for a (key, type) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingCard {
    pub key: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub card: CardState,
    pub mode: ReviewMode,
    pub lesson_id: Option<String>,
    /// Review events replayed to produce `card`.
    pub history: Vec<ReviewEvent>,
}

/// Terminal artifact of the pipeline, handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertRecord {
    pub key: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub card: CardState,
    pub mode: ReviewMode,
    pub logs: Vec<SimulationLog>,
    pub lesson_id: Option<String>,
    /// Merged review stream the card was replayed from.
    pub history: Vec<ReviewEvent>,
}

impl UpsertRecord {
    /// Grouping key used for deduplication.
    pub fn identity(&self) -> (&str, ItemType) {
        (self.key.as_str(), self.item_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_state_round_trips_through_str() {
        for state in [
            SchedulingState::New,
            SchedulingState::Learning,
            SchedulingState::Review,
            SchedulingState::Relearning,
        ] {
            assert_eq!(SchedulingState::parse(state.as_str()), state);
        }
        assert_eq!(SchedulingState::parse("bogus"), SchedulingState::New);
    }

    #[test]
    fn item_type_rejects_unknown() {
        assert_eq!(ItemType::parse("kanji"), Some(ItemType::Kanji));
        assert_eq!(ItemType::parse("sentence"), None);
    }

    #[test]
    fn new_card_is_not_never_forget() {
        let card = CardState::new_at(Utc::now());
        assert!(!card.is_never_forget());
        assert_eq!(card.state, SchedulingState::New);
        assert_eq!(card.last_review, None);
    }
}
