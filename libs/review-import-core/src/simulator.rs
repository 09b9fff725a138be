//! Replay of an ordered review stream through a scheduler.

use chrono::{DateTime, Months, Utc};
use thiserror::Error;

use crate::error::SchedulerError;
use crate::grade::map_grade;
use crate::scheduler::{Scheduler, Transition};
use crate::types::{CardState, ControlAction, GradeOutcome, ReviewEvent, SchedulingState, SimulationLog};

/// How far into the future a never-forget card is scheduled.
pub const NEVER_FORGET_HORIZON: Months = Months::new(120);

/// Final card and the logs emitted while replaying.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub card: CardState,
    pub logs: Vec<SimulationLog>,
}

/// Scheduler failure part-way through a stream.
///
/// `partial` holds the card after the last successful transition; events from
/// `failed_at` onwards were not applied.
#[derive(Debug, Error)]
#[error("scheduler failed at event {failed_at} ({timestamp}): {source}")]
pub struct SimulationError {
    pub failed_at: usize,
    pub timestamp: DateTime<Utc>,
    pub partial: SimulationOutcome,
    #[source]
    pub source: SchedulerError,
}

/// Replay `events` (non-decreasing by timestamp) against a card.
///
/// A non-empty stream starts from a fresh card created at the first event's
/// timestamp; an empty one returns `initial` untouched.
pub fn simulate(
    scheduler: &dyn Scheduler,
    initial: &CardState,
    events: &[ReviewEvent],
) -> Result<SimulationOutcome, SimulationError> {
    let Some(first) = events.first() else {
        return Ok(SimulationOutcome {
            card: initial.clone(),
            logs: Vec::new(),
        });
    };

    let mut card = scheduler.new_card(first.timestamp);
    let mut logs = Vec::new();

    for (index, event) in events.iter().enumerate() {
        let now = event.timestamp;
        let step = match map_grade(&event.grade) {
            GradeOutcome::Control(ControlAction::Ignore) => continue,
            GradeOutcome::Control(ControlAction::NeverForget) => {
                // Later events are deliberately not replayed.
                mark_never_forget(&mut card, now);
                return Ok(SimulationOutcome { card, logs });
            }
            GradeOutcome::Control(ControlAction::Forget) => scheduler.forget(&card, now, false),
            GradeOutcome::Rating(rating) => scheduler.next(&card, now, rating),
        };

        match step {
            Ok(Transition { card: next, log }) => {
                card = next;
                logs.extend(log);
            }
            Err(source) => {
                return Err(SimulationError {
                    failed_at: index,
                    timestamp: now,
                    partial: SimulationOutcome { card, logs },
                    source,
                });
            }
        }
    }

    Ok(SimulationOutcome { card, logs })
}

fn mark_never_forget(card: &mut CardState, now: DateTime<Utc>) {
    card.state = SchedulingState::Review;
    card.due = now
        .checked_add_months(NEVER_FORGET_HORIZON)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    card.stability = f64::INFINITY;
    card.last_review = Some(now);
}
