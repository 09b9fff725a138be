//! Core review import library shared by the import service and its tests.
//!
//! Provides:
//! - Grade mapping from vendor grades to ratings and control actions
//! - Chronological merging of stored and incoming review streams
//! - Review replay through a pluggable scheduler (FSRS bundled)
//! - Deduplication of records resolving to the same item
//! - Source adapters for vendor exports
//! - Shared types (CardState, ReviewEvent, UpsertRecord, etc.)

pub mod adapters;
pub mod chunk;
pub mod dedupe;
pub mod error;
pub mod grade;
pub mod merge;
pub mod scheduler;
pub mod simulator;
pub mod types;

pub use adapters::{get_adapter, SourceAdapter};
pub use chunk::chunk;
pub use dedupe::{dedupe, Deduplicated};
pub use error::{ExportError, Result, SchedulerError};
pub use grade::map_grade;
pub use merge::merge_reviews;
pub use scheduler::{get_scheduler, Scheduler, Transition};
pub use simulator::{simulate, SimulationError, SimulationOutcome};
pub use types::{
    CanonicalItem, CardState, ControlAction, ExistingCard, GradeOutcome, ItemType, LogRating,
    NormalizedCard, Rating, ReviewEvent, ReviewMode, SchedulingState, SimulationLog, UpsertRecord,
};
