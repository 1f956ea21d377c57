use serde::Serialize;

pub const DEFAULT_GROUP_MASTERY_THRESHOLD: i64 = 3;

/// Counts recomputed for one (user, group) evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTally {
    pub words_total: i64,
    pub words_started: i64,
    pub words_mastered: i64,
}

impl GroupTally {
    pub fn is_complete(&self) -> bool {
        self.words_total > 0 && self.words_mastered >= self.words_total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupTransition {
    InProgress,
    /// The one-way transition happened on this evaluation.
    NewlyCompleted,
    AlreadyCompleted,
}

impl GroupTransition {
    pub fn is_completed(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Completion never reverts: a completed group stays completed whatever the
/// current tally says.
pub fn evaluate_transition(already_completed: bool, tally: &GroupTally) -> GroupTransition {
    if already_completed {
        GroupTransition::AlreadyCompleted
    } else if tally.is_complete() {
        GroupTransition::NewlyCompleted
    } else {
        GroupTransition::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(total: i64, mastered: i64) -> GroupTally {
        GroupTally {
            words_total: total,
            words_started: mastered,
            words_mastered: mastered,
        }
    }

    #[test]
    fn test_nine_of_ten_is_in_progress() {
        assert_eq!(evaluate_transition(false, &tally(10, 9)), GroupTransition::InProgress);
        assert_eq!(evaluate_transition(false, &tally(10, 10)), GroupTransition::NewlyCompleted);
    }

    #[test]
    fn test_empty_group_never_completes() {
        assert!(!tally(0, 0).is_complete());
        assert_eq!(evaluate_transition(false, &tally(0, 0)), GroupTransition::InProgress);
    }

    #[test]
    fn test_completed_group_does_not_revert() {
        let transition = evaluate_transition(true, &tally(10, 2));
        assert_eq!(transition, GroupTransition::AlreadyCompleted);
        assert!(transition.is_completed());
    }
}
