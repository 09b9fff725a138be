//! Pluggable spaced repetition scheduling capability.

pub mod fsrs;

use crate::error::SchedulerError;
use crate::types::{CardState, Rating, SimulationLog};
use chrono::{DateTime, Utc};

/// Result of applying one operation to a card.
#[derive(Debug, Clone)]
pub struct Transition {
    pub card: CardState,
    /// Absent when the operation left nothing worth recording.
    pub log: Option<SimulationLog>,
}

/// Strategy interface for spaced repetition schedulers.
pub trait Scheduler: Send + Sync {
    /// Scheduler identifier.
    fn name(&self) -> &'static str;

    /// A fresh, never-reviewed card created at `created_at`.
    fn new_card(&self, created_at: DateTime<Utc>) -> CardState;

    /// Apply a rated review at `now`.
    fn next(
        &self,
        card: &CardState,
        now: DateTime<Utc>,
        rating: Rating,
    ) -> Result<Transition, SchedulerError>;

    /// Reset a card to the new state at `now`.
    fn forget(
        &self,
        card: &CardState,
        now: DateTime<Utc>,
        reset_count: bool,
    ) -> Result<Transition, SchedulerError>;
}

/// Get scheduler by name.
pub fn get_scheduler(name: &str) -> Option<Box<dyn Scheduler>> {
    match name {
        "fsrs" => Some(Box::new(fsrs::Fsrs::default())),
        _ => None,
    }
}
