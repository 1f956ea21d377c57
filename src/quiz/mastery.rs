//! Mastery/spacing tracker.
//!
//! Every answer moves a word's mastery by a fixed, asymmetric amount: a
//! correct answer gains [`MASTERY_CORRECT_DELTA`], a wrong one costs
//! [`MASTERY_INCORRECT_PENALTY`]. Mastery has no floor. Once a correct answer
//! leaves mastery at or above [`MASTERY_REVIEW_THRESHOLD`] the word is
//! scheduled for spaced review using [`review_interval_days`].

use chrono::{DateTime, Duration, Utc};

use super::types::WordProgress;

pub const MASTERY_CORRECT_DELTA: i64 = 1;
pub const MASTERY_INCORRECT_PENALTY: i64 = 2;
pub const MASTERY_REVIEW_THRESHOLD: i64 = 3;
pub const MASTERY_MASTERED_THRESHOLD: i64 = 6;

/// Interval bands as `(upper bound inclusive, days)`, checked in order.
const INTERVAL_BANDS: [(i64, i64); 4] = [(-1, 1), (2, 2), (5, 7), (8, 21)];
const LONG_INTERVAL_DAYS: i64 = 60;

/// Days until the next review for a given mastery. Monotone step function.
pub fn review_interval_days(mastery: i64) -> i64 {
    INTERVAL_BANDS
        .iter()
        .find(|(upper, _)| mastery <= *upper)
        .map(|(_, days)| *days)
        .unwrap_or(LONG_INTERVAL_DAYS)
}

pub fn next_due_date(mastery: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(review_interval_days(mastery))
}

pub fn is_learning(mastery: i64) -> bool {
    mastery < MASTERY_MASTERED_THRESHOLD
}

/// Schedules a spaced review from the record's current mastery.
pub fn schedule_review(progress: &mut WordProgress, now: DateTime<Utc>) {
    progress.interval_days = review_interval_days(progress.mastery);
    progress.due_date = Some(next_due_date(progress.mastery, now));
    progress.marked_for_review = true;
}

/// Applies one answer and returns the updated record.
pub fn apply_answer(progress: &WordProgress, is_correct: bool, now: DateTime<Utc>) -> WordProgress {
    let mut next = progress.clone();

    if is_correct {
        next.mastery += MASTERY_CORRECT_DELTA;
        next.times_correct += 1;
        next.consecutive_correct += 1;
    } else {
        next.mastery -= MASTERY_INCORRECT_PENALTY;
        next.consecutive_correct = 0;
    }
    next.times_asked += 1;
    next.last_practiced = now;

    if is_correct && next.mastery >= MASTERY_REVIEW_THRESHOLD {
        schedule_review(&mut next, now);
    }

    next.is_learning = is_learning(next.mastery);
    next
}

/// True when this answer carried mastery across the mastered threshold.
pub fn crossed_mastered_threshold(before: i64, after: i64) -> bool {
    before < MASTERY_MASTERED_THRESHOLD && after >= MASTERY_MASTERED_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn progress_at(mastery: i64) -> WordProgress {
        let mut progress = WordProgress::new("u1", 1, now());
        progress.mastery = mastery;
        progress.is_learning = is_learning(mastery);
        progress
    }

    #[test]
    fn test_interval_bands() {
        assert_eq!(review_interval_days(-5), 1);
        assert_eq!(review_interval_days(-1), 1);
        assert_eq!(review_interval_days(0), 2);
        assert_eq!(review_interval_days(2), 2);
        assert_eq!(review_interval_days(3), 7);
        assert_eq!(review_interval_days(5), 7);
        assert_eq!(review_interval_days(6), 21);
        assert_eq!(review_interval_days(8), 21);
        assert_eq!(review_interval_days(9), 60);
        assert_eq!(review_interval_days(500), 60);
    }

    #[test]
    fn test_interval_is_monotone() {
        let mut previous = review_interval_days(-20);
        for mastery in -19..=20 {
            let days = review_interval_days(mastery);
            assert!(days >= previous, "interval dropped at mastery {mastery}");
            previous = days;
        }
    }

    #[test]
    fn test_fresh_record_incorrect_answer() {
        let fresh = WordProgress::new("u1", 1, now());
        let after = apply_answer(&fresh, false, now());

        assert_eq!(after.mastery, -2);
        assert_eq!(after.consecutive_correct, 0);
        assert_eq!(after.times_asked, 1);
        assert_eq!(after.times_correct, 0);
        assert!(after.due_date.is_none());
        assert!(!after.marked_for_review);
        assert!(after.is_learning);
    }

    #[test]
    fn test_three_correct_from_two_schedules_weekly_review() {
        let start = progress_at(2);

        let first = apply_answer(&start, true, now());
        assert_eq!(first.mastery, 3);
        assert_eq!(first.due_date, Some(now() + Duration::days(7)));
        assert!(first.marked_for_review);

        let later = now() + Duration::hours(1);
        let second = apply_answer(&first, true, later);
        let third = apply_answer(&second, true, later);
        assert_eq!(third.mastery, 5);
        assert_eq!(third.consecutive_correct, 3);
        assert_eq!(third.interval_days, 7);
        assert_eq!(third.due_date, Some(later + Duration::days(7)));
        assert!(third.is_learning);
    }

    #[test]
    fn test_incorrect_answer_keeps_existing_due_date() {
        let mut start = progress_at(4);
        start.due_date = Some(now() + Duration::days(7));
        start.marked_for_review = true;
        start.consecutive_correct = 3;

        let after = apply_answer(&start, false, now() + Duration::days(1));
        assert_eq!(after.mastery, 2);
        assert_eq!(after.consecutive_correct, 0);
        assert_eq!(after.due_date, start.due_date);
        assert!(after.marked_for_review);
    }

    #[test]
    fn test_schedule_review_uses_next_due_date() {
        let mut progress = WordProgress::new("u1", 1, now());
        progress.mastery = 9;
        schedule_review(&mut progress, now());
        assert_eq!(progress.due_date, Some(next_due_date(9, now())));
        assert_eq!(progress.interval_days, 60);
        assert!(progress.marked_for_review);
    }

    #[test]
    fn test_no_lower_bound() {
        let mut progress = progress_at(-10);
        for _ in 0..5 {
            progress = apply_answer(&progress, false, now());
        }
        assert_eq!(progress.mastery, -20);
    }

    #[test]
    fn test_is_learning_flips_at_mastered_threshold() {
        let five = progress_at(5);
        let six = apply_answer(&five, true, now());
        assert!(!six.is_learning);
        assert!(crossed_mastered_threshold(five.mastery, six.mastery));

        let back = apply_answer(&six, false, now());
        assert!(back.is_learning);
        assert!(!crossed_mastered_threshold(six.mastery, back.mastery));
    }
}
