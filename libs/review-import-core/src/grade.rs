//! Mapping of vendor grade strings to ratings and control actions.

use crate::types::{ControlAction, GradeOutcome, Rating};

/// Map an external grade to a rating or control action.
///
/// Total: unrecognised grades fall back to `Again` and are logged.
pub fn map_grade(grade: &str) -> GradeOutcome {
    match grade {
        "okay" | "known" => GradeOutcome::Rating(Rating::Good),
        "hard" => GradeOutcome::Rating(Rating::Hard),
        "something" => GradeOutcome::Rating(Rating::Again),
        "easy" => GradeOutcome::Rating(Rating::Easy),
        "unknown" => GradeOutcome::Control(ControlAction::Ignore),
        "nothing" => GradeOutcome::Control(ControlAction::Forget),
        "never-forget" => GradeOutcome::Control(ControlAction::NeverForget),
        other => {
            tracing::warn!(grade = other, "unrecognised grade, treating as again");
            GradeOutcome::Rating(Rating::Again)
        }
    }
}
