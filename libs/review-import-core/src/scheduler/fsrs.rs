//! FSRS (Free Spaced Repetition Scheduler) algorithm.
//!
//! Modern algorithm based on memory research using DSR model:
//! - Difficulty (D): Card difficulty 1-10
//! - Stability (S): Days until retention drops to target
//! - Retrievability (R): Probability of recall

use super::{Scheduler, Transition};
use crate::error::SchedulerError;
use crate::types::{CardState, LogRating, Rating, SchedulingState, SimulationLog};
use chrono::{DateTime, Duration, Utc};

/// FSRS algorithm with configurable parameters.
#[derive(Debug, Clone)]
pub struct Fsrs {
    pub request_retention: f64,
    pub maximum_interval: f64,
    /// FSRS-4.5 parameters (17 weights).
    pub w: [f64; 17],
}

impl Default for Fsrs {
    fn default() -> Self {
        Self {
            request_retention: 0.9,
            maximum_interval: 36500.0,
            w: [
                0.4, 0.6, 2.4, 5.8, // w[0-3]: initial stability for Again, Hard, Good, Easy
                4.93,  // w[4]: initial difficulty base
                0.94,  // w[5]: initial difficulty modifier
                0.86,  // w[6]: difficulty decay
                0.01,  // w[7]: mean reversion weight
                1.49,  // w[8]: stability exp base
                0.14,  // w[9]: stability decay
                0.94,  // w[10]: retrievability effect
                2.18,  // w[11]: forget stability base
                0.05,  // w[12]: difficulty on forget
                0.34,  // w[13]: stability on forget
                1.26,  // w[14]: retrievability on forget
                0.29,  // w[15]: hard penalty
                2.61,  // w[16]: easy bonus
            ],
        }
    }
}

impl Scheduler for Fsrs {
    fn name(&self) -> &'static str {
        "fsrs"
    }

    fn new_card(&self, created_at: DateTime<Utc>) -> CardState {
        CardState::new_at(created_at)
    }

    fn next(
        &self,
        card: &CardState,
        now: DateTime<Utc>,
        rating: Rating,
    ) -> Result<Transition, SchedulerError> {
        Self::check_finite(card)?;

        let rating_value = rating.to_value();
        let elapsed = Self::elapsed_days(card, now);
        let is_first_review = card.state == SchedulingState::New || card.stability <= 0.0;

        let (new_stability, new_difficulty, new_lapses) = if is_first_review {
            (
                self.initial_stability(rating_value),
                self.initial_difficulty(rating_value),
                card.lapses,
            )
        } else {
            self.schedule_subsequent_review(card, rating_value, elapsed)
        };

        if !new_stability.is_finite() {
            return Err(SchedulerError::NonFiniteOutput { field: "stability" });
        }
        if !new_difficulty.is_finite() {
            return Err(SchedulerError::NonFiniteOutput { field: "difficulty" });
        }

        let new_interval = if rating_value == 1 {
            self.short_term_interval(new_stability)
        } else {
            self.interval_from_stability(new_stability)
        };

        let next_due = now
            .checked_add_signed(Duration::seconds((new_interval * 86400.0) as i64))
            .ok_or(SchedulerError::DueOutOfRange { reviewed_at: now })?;
        let new_state = Self::determine_state(card.state, rating_value);

        let next = CardState {
            stability: new_stability,
            difficulty: new_difficulty,
            due: next_due,
            last_review: Some(now),
            state: new_state,
            elapsed_days: elapsed,
            scheduled_days: new_interval,
            reps: card.reps + 1,
            lapses: new_lapses,
        };
        let log = SimulationLog {
            previous_state: card.state,
            new_state,
            rating: rating.into(),
            reviewed_at: now,
            stability: new_stability,
            difficulty: new_difficulty,
            due: next_due,
        };

        Ok(Transition {
            card: next,
            log: Some(log),
        })
    }

    fn forget(
        &self,
        card: &CardState,
        now: DateTime<Utc>,
        reset_count: bool,
    ) -> Result<Transition, SchedulerError> {
        // Nothing to reset on a card that was never reviewed.
        if card.state == SchedulingState::New && card.last_review.is_none() {
            return Ok(Transition {
                card: card.clone(),
                log: None,
            });
        }

        let reset = CardState {
            stability: 0.0,
            difficulty: 0.0,
            due: now,
            last_review: card.last_review,
            state: SchedulingState::New,
            elapsed_days: 0.0,
            scheduled_days: 0.0,
            reps: if reset_count { 0 } else { card.reps },
            lapses: if reset_count { 0 } else { card.lapses },
        };
        let log = SimulationLog {
            previous_state: card.state,
            new_state: SchedulingState::New,
            rating: LogRating::Manual,
            reviewed_at: now,
            stability: 0.0,
            difficulty: 0.0,
            due: now,
        };

        Ok(Transition {
            card: reset,
            log: Some(log),
        })
    }
}

impl Fsrs {
    /// FSRS with a custom target retention, clamped to (0, 1).
    pub fn with_retention(request_retention: f64) -> Self {
        Self {
            request_retention: request_retention.clamp(0.01, 0.99),
            ..Default::default()
        }
    }

    fn check_finite(card: &CardState) -> Result<(), SchedulerError> {
        if !card.stability.is_finite() {
            return Err(SchedulerError::NonFiniteInput {
                field: "stability",
                value: card.stability,
            });
        }
        if !card.difficulty.is_finite() {
            return Err(SchedulerError::NonFiniteInput {
                field: "difficulty",
                value: card.difficulty,
            });
        }
        Ok(())
    }

    /// Calculate initial stability for a new card based on first rating.
    /// S0(G) = w[G-1] where G is rating 1-4
    fn initial_stability(&self, rating: u8) -> f64 {
        let index = (rating.saturating_sub(1)) as usize;
        self.w[index.min(3)].max(0.1)
    }

    /// Calculate initial difficulty for a new card based on first rating.
    /// D0(G) = w[4] - w[5] * (G - 3)
    fn initial_difficulty(&self, rating: u8) -> f64 {
        let d0 = self.w[4] - self.w[5] * (rating as f64 - 3.0);
        d0.clamp(1.0, 10.0)
    }

    /// Calculate next difficulty using mean reversion.
    /// D' = w[7] * D0(G) + (1 - w[7]) * D
    /// Apply decay: D'' = D' - w[6] * (G - 3)
    fn next_difficulty(&self, current_d: f64, rating: u8) -> f64 {
        let d0 = self.initial_difficulty(rating);
        let d_new = self.w[7] * d0 + (1.0 - self.w[7]) * current_d;
        let d_decayed = d_new - self.w[6] * (rating as f64 - 3.0);
        d_decayed.clamp(1.0, 10.0)
    }

    /// Calculate retrievability (probability of recall).
    /// R = (1 + t / (9 * S))^(-1)
    fn retrievability(&self, elapsed_days: f64, stability: f64) -> f64 {
        if stability <= 0.0 {
            return 0.0;
        }
        let factor = 1.0 + elapsed_days / (9.0 * stability);
        factor.powf(-1.0)
    }

    /// Calculate next stability after successful recall.
    /// S' = S * (e^(w[8]) * (11 - D) * S^(-w[9]) * (e^(w[10]*(1-R)) - 1) + 1) * modifier
    fn next_stability_recall(
        &self,
        stability: f64,
        difficulty: f64,
        retrievability: f64,
        rating: u8,
    ) -> f64 {
        let exp_w8 = self.w[8].exp();
        let d_factor = (11.0 - difficulty).max(0.1);
        let s_decay = stability.powf(-self.w[9]);
        let r_factor = (self.w[10] * (1.0 - retrievability)).exp() - 1.0;

        let growth = exp_w8 * d_factor * s_decay * r_factor + 1.0;

        let modifier = match rating {
            2 => self.w[15], // Hard penalty
            4 => self.w[16], // Easy bonus
            _ => 1.0,
        };

        let new_s = stability * growth * modifier;
        new_s.max(0.1).min(self.maximum_interval)
    }

    /// Calculate next stability after forgetting (lapse).
    /// S' = w[11] * D^(-w[12]) * ((S+1)^w[13] - 1) * e^(w[14]*(1-R))
    fn next_stability_forget(&self, stability: f64, difficulty: f64, retrievability: f64) -> f64 {
        let d_factor = difficulty.max(1.0).powf(-self.w[12]);
        let s_factor = (stability + 1.0).powf(self.w[13]) - 1.0;
        let r_factor = (self.w[14] * (1.0 - retrievability)).exp();

        let new_s = self.w[11] * d_factor * s_factor * r_factor;
        // Never exceed previous stability on lapse
        new_s.max(0.1).min(stability)
    }

    /// Calculate optimal interval from stability.
    /// I = 9 * S * (1/R - 1) where R = request_retention
    fn interval_from_stability(&self, stability: f64) -> f64 {
        if self.request_retention <= 0.0 || self.request_retention >= 1.0 {
            return stability;
        }
        let interval = 9.0 * stability * (1.0 / self.request_retention - 1.0);
        interval.max(1.0).min(self.maximum_interval)
    }

    /// Short-term interval for learning/relearning states, 10 minutes to 1 day.
    fn short_term_interval(&self, stability: f64) -> f64 {
        let minutes = (stability * 60.0).max(10.0).min(1440.0);
        minutes / 1440.0
    }

    /// Days since the last review, zero for unreviewed cards.
    fn elapsed_days(card: &CardState, now: DateTime<Utc>) -> f64 {
        match card.last_review {
            Some(last) => {
                let elapsed = now.signed_duration_since(last);
                (elapsed.num_seconds() as f64 / 86400.0).max(0.0)
            }
            None => 0.0,
        }
    }

    /// Determine new state based on current state and rating.
    fn determine_state(current: SchedulingState, rating: u8) -> SchedulingState {
        match (current, rating) {
            (SchedulingState::New, 1) => SchedulingState::Learning,
            (SchedulingState::New, _) => SchedulingState::Review,
            (SchedulingState::Learning, 1) => SchedulingState::Learning,
            (SchedulingState::Learning, _) => SchedulingState::Review,
            (SchedulingState::Review, 1) => SchedulingState::Relearning,
            (SchedulingState::Review, _) => SchedulingState::Review,
            (SchedulingState::Relearning, 1) => SchedulingState::Relearning,
            (SchedulingState::Relearning, _) => SchedulingState::Review,
        }
    }

    /// Update stability, difficulty and lapses for an already-reviewed card.
    fn schedule_subsequent_review(
        &self,
        card: &CardState,
        rating: u8,
        elapsed: f64,
    ) -> (f64, f64, u32) {
        let r = self.retrievability(elapsed, card.stability);
        let new_d = self.next_difficulty(card.difficulty, rating);

        if rating == 1 {
            let s = self.next_stability_forget(card.stability, card.difficulty, r);
            (s, new_d, card.lapses + 1)
        } else {
            let s = self.next_stability_recall(card.stability, card.difficulty, r, rating);
            (s, new_d, card.lapses)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn review_card(stability: f64, difficulty: f64, last: DateTime<Utc>) -> CardState {
        CardState {
            stability,
            difficulty,
            due: last,
            last_review: Some(last),
            state: SchedulingState::Review,
            elapsed_days: 0.0,
            scheduled_days: stability,
            reps: 5,
            lapses: 0,
        }
    }

    #[test]
    fn new_card_first_review_good() {
        let fsrs = Fsrs::default();
        let card = fsrs.new_card(at(0));
        let t = fsrs.next(&card, at(100), Rating::Good).unwrap();

        assert_eq!(t.card.state, SchedulingState::Review);
        assert!(t.card.stability > 0.0);
        assert!(t.card.difficulty >= 1.0);
        assert_eq!(t.card.reps, 1);
        assert_eq!(t.card.last_review, Some(at(100)));
        assert!(t.card.due > at(100));

        let log = t.log.unwrap();
        assert_eq!(log.previous_state, SchedulingState::New);
        assert_eq!(log.new_state, SchedulingState::Review);
        assert_eq!(log.rating, LogRating::Good);
    }

    #[test]
    fn new_card_first_review_again() {
        let fsrs = Fsrs::default();
        let card = fsrs.new_card(at(0));
        let t = fsrs.next(&card, at(0), Rating::Again).unwrap();

        assert_eq!(t.card.state, SchedulingState::Learning);
        assert!(t.card.scheduled_days < 1.0);
    }

    #[test]
    fn easy_first_review_has_higher_stability() {
        let fsrs = Fsrs::default();
        let card = fsrs.new_card(at(0));
        let good = fsrs.next(&card, at(0), Rating::Good).unwrap();
        let easy = fsrs.next(&card, at(0), Rating::Easy).unwrap();
        assert!(easy.card.stability > good.card.stability);
    }

    #[test]
    fn stability_increases_on_successful_recall() {
        let fsrs = Fsrs::default();
        let card = review_card(5.0, 5.0, at(0));
        let t = fsrs.next(&card, at(5 * 86400), Rating::Good).unwrap();
        assert!(t.card.stability > 5.0);
    }

    #[test]
    fn stability_decreases_on_lapse() {
        let fsrs = Fsrs::default();
        let card = review_card(10.0, 5.0, at(0));
        let t = fsrs.next(&card, at(10 * 86400), Rating::Again).unwrap();

        assert!(t.card.stability < 10.0);
        assert_eq!(t.card.lapses, 1);
        assert_eq!(t.card.state, SchedulingState::Relearning);
    }

    #[test]
    fn hard_penalty_and_easy_bonus() {
        let fsrs = Fsrs::default();
        let card = review_card(10.0, 5.0, at(0));
        let now = at(10 * 86400);

        let hard = fsrs.next(&card, now, Rating::Hard).unwrap();
        let good = fsrs.next(&card, now, Rating::Good).unwrap();
        let easy = fsrs.next(&card, now, Rating::Easy).unwrap();

        assert!(hard.card.stability < good.card.stability);
        assert!(easy.card.stability > good.card.stability);
    }

    #[test]
    fn interval_respects_maximum() {
        let fsrs = Fsrs::default();
        let card = review_card(50000.0, 5.0, at(0));
        let t = fsrs.next(&card, at(86400), Rating::Good).unwrap();
        assert!(t.card.scheduled_days <= fsrs.maximum_interval);
    }

    #[test]
    fn retrievability_formula() {
        let fsrs = Fsrs::default();
        assert!((fsrs.retrievability(0.0, 10.0) - 1.0).abs() < 0.001);
        assert!((fsrs.retrievability(90.0, 10.0) - 0.5).abs() < 0.001);
    }

    #[test]
    fn rejects_infinite_stability() {
        let fsrs = Fsrs::default();
        let card = review_card(f64::INFINITY, 5.0, at(0));
        let err = fsrs.next(&card, at(1), Rating::Good).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::NonFiniteInput {
                field: "stability",
                ..
            }
        ));
    }

    #[test]
    fn due_past_calendar_limit_is_an_error() {
        let fsrs = Fsrs::default();
        let now = DateTime::<Utc>::MAX_UTC - Duration::seconds(10);
        let card = fsrs.new_card(now);

        let err = fsrs.next(&card, now, Rating::Good).unwrap_err();
        assert_eq!(err, SchedulerError::DueOutOfRange { reviewed_at: now });
    }

    #[test]
    fn forget_on_unreviewed_card_is_noop() {
        let fsrs = Fsrs::default();
        let card = fsrs.new_card(at(0));
        let t = fsrs.forget(&card, at(50), false).unwrap();
        assert_eq!(t.card, card);
        assert!(t.log.is_none());
    }

    #[test]
    fn forget_resets_reviewed_card() {
        let fsrs = Fsrs::default();
        let card = review_card(10.0, 5.0, at(0));
        let t = fsrs.forget(&card, at(100), false).unwrap();

        assert_eq!(t.card.state, SchedulingState::New);
        assert_eq!(t.card.stability, 0.0);
        assert_eq!(t.card.due, at(100));
        assert_eq!(t.card.reps, 5);
        assert_eq!(t.log.unwrap().rating, LogRating::Manual);

        let reset = fsrs.forget(&card, at(100), true).unwrap();
        assert_eq!(reset.card.reps, 0);
    }

    #[test]
    fn review_after_forget_starts_over() {
        let fsrs = Fsrs::default();
        let card = review_card(10.0, 5.0, at(0));
        let forgotten = fsrs.forget(&card, at(100), false).unwrap().card;
        let t = fsrs.next(&forgotten, at(200), Rating::Easy).unwrap();

        assert_eq!(t.card.state, SchedulingState::Review);
        assert_eq!(t.card.stability, fsrs.initial_stability(4));
    }

    #[test]
    fn initial_values_are_monotonic_in_rating() {
        let fsrs = Fsrs::default();
        assert!(fsrs.initial_stability(1) < fsrs.initial_stability(2));
        assert!(fsrs.initial_stability(3) < fsrs.initial_stability(4));
        assert!(fsrs.initial_difficulty(1) > fsrs.initial_difficulty(2));
        assert!(fsrs.initial_difficulty(3) > fsrs.initial_difficulty(4));
    }
}
