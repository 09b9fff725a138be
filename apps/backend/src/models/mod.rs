//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Re-export shared types from review-import-core
pub use review_import_core::types::{
    CanonicalItem, CardState, ExistingCard, ItemType, NormalizedCard, ReviewEvent, ReviewMode,
    SchedulingState, SimulationLog, UpsertRecord,
};

// === Database Entity Types ===

/// Card record stored in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSrsCard {
    pub user_id: Uuid,
    pub item_key: String,
    pub item_type: String,
    pub mode: String,
    pub lesson_id: Option<String>,
    pub stability: f64,
    pub difficulty: f64,
    pub due: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
    pub state: String,
    pub elapsed_days: f64,
    pub scheduled_days: f64,
    pub reps: i32,
    pub lapses: i32,
}

impl DbSrsCard {
    /// Convert to review-import-core CardState
    pub fn to_core_card(&self) -> CardState {
        CardState {
            stability: self.stability,
            difficulty: self.difficulty,
            due: self.due,
            last_review: self.last_review,
            state: SchedulingState::parse(&self.state),
            elapsed_days: self.elapsed_days,
            scheduled_days: self.scheduled_days,
            reps: self.reps.max(0) as u32,
            lapses: self.lapses.max(0) as u32,
        }
    }

    /// Convert to an ExistingCard. Rows with an unknown item type are skipped.
    pub fn into_existing(self, history: Vec<ReviewEvent>) -> Option<ExistingCard> {
        let item_type = ItemType::parse(&self.item_type)?;
        Some(ExistingCard {
            card: self.to_core_card(),
            mode: ReviewMode::parse(&self.mode),
            key: self.item_key,
            item_type,
            lesson_id: self.lesson_id,
            history,
        })
    }
}

/// Stored review event
#[derive(Debug, Clone, FromRow)]
pub struct DbReviewHistory {
    pub item_key: String,
    pub item_type: String,
    pub reviewed_at: DateTime<Utc>,
    pub grade: String,
    pub source: String,
}

impl DbReviewHistory {
    pub fn to_event(&self) -> ReviewEvent {
        ReviewEvent::new(self.reviewed_at, self.grade.clone(), self.source.clone())
    }
}

/// Search term lookup row
#[derive(Debug, Clone, FromRow)]
pub struct DbItemLookup {
    pub search_term: String,
    pub item_key: String,
    pub item_type: String,
}

// === API Request/Response Types ===

/// Import request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Source adapter name (e.g. "jpdb").
    pub source: String,
    /// Raw vendor export.
    pub export: serde_json::Value,
}
