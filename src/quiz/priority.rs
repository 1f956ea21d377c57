//! Ranks a candidate word pool by urgency.
//!
//! Base priority comes from [`PriorityBand`]; two additive boosts apply on
//! top. Ties keep input order (the sort is stable).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{Word, WordProgress};

pub const DUE_REVIEW_BOOST: i64 = 200;
pub const LOW_ACCURACY_BOOST: i64 = 100;
/// Accuracy strictly below this fraction earns [`LOW_ACCURACY_BOOST`].
pub const LOW_ACCURACY_CUTOFF: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityBand {
    /// No progress record yet.
    Unseen,
    /// mastery <= 0
    Struggling,
    /// mastery 1..=2
    Shaky,
    /// mastery 3..=5
    Practicing,
    /// mastery >= 6
    Mastered,
}

impl PriorityBand {
    pub fn of(progress: Option<&WordProgress>) -> Self {
        let Some(progress) = progress else {
            return Self::Unseen;
        };
        match progress.mastery {
            m if m <= 0 => Self::Struggling,
            1..=2 => Self::Shaky,
            3..=5 => Self::Practicing,
            _ => Self::Mastered,
        }
    }

    /// Base priority before boosts.
    pub fn base_priority(self, mastery: i64) -> i64 {
        match self {
            Self::Unseen => 1000,
            Self::Struggling => 500 + mastery.abs(),
            Self::Shaky => 300 + (3 - mastery),
            Self::Practicing => 100 + (6 - mastery),
            Self::Mastered => 10,
        }
    }
}

/// Boosts applied on top of the band priority.
pub fn boosts(progress: &WordProgress, now: DateTime<Utc>) -> i64 {
    let mut boost = 0;
    if progress.is_due_for_review(now) {
        boost += DUE_REVIEW_BOOST;
    }
    if progress
        .accuracy()
        .is_some_and(|accuracy| accuracy < LOW_ACCURACY_CUTOFF)
    {
        boost += LOW_ACCURACY_BOOST;
    }
    boost
}

pub fn word_priority(progress: Option<&WordProgress>, now: DateTime<Utc>) -> i64 {
    let band = PriorityBand::of(progress);
    match progress {
        None => band.base_priority(0),
        Some(progress) => band.base_priority(progress.mastery) + boosts(progress, now),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedWord<'a> {
    pub word: &'a Word,
    pub priority: i64,
    pub mastery: i64,
    pub band: PriorityBand,
}

/// Builds the ordered queue over `words`. Pure: reads the progress snapshot only.
pub fn build_queue<'a>(
    words: &'a [Word],
    progress: &HashMap<i64, WordProgress>,
    now: DateTime<Utc>,
) -> Vec<QueuedWord<'a>> {
    let mut queue: Vec<QueuedWord<'a>> = words
        .iter()
        .map(|word| {
            let record = progress.get(&word.id);
            QueuedWord {
                word,
                priority: word_priority(record, now),
                mastery: record.map(|p| p.mastery).unwrap_or(0),
                band: PriorityBand::of(record),
            }
        })
        .collect();

    queue.sort_by(|a, b| b.priority.cmp(&a.priority));
    queue
}
