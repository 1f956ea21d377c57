//! Property-based tests for the quiz state machines
//!
//! Covers:
//! - Mastery moves +1 on a correct answer and -2 on a miss, with no floor
//! - A miss always resets the consecutive-correct streak
//! - Review intervals never shrink as mastery grows
//! - Retry queue keeps unique entries and a stable head
//! - Group completion never reverts

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};

use vocab_quiz_backend::quiz::completion::{evaluate_transition, GroupTally, GroupTransition};
use vocab_quiz_backend::quiz::mastery::{apply_answer, review_interval_days};
use vocab_quiz_backend::quiz::options::build_options;
use vocab_quiz_backend::quiz::{RetryQueue, WordProgress};

// ============================================================================
// Generators
// ============================================================================

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
}

fn arb_progress() -> impl Strategy<Value = WordProgress> {
    (-40i64..=40, 0i64..=50, 0i64..=10).prop_map(|(mastery, asked, streak)| {
        let mut progress = WordProgress::new("pbt-user", 1, fixed_now());
        progress.mastery = mastery;
        progress.times_asked = asked;
        progress.times_correct = asked / 2;
        progress.consecutive_correct = streak;
        progress
    })
}

#[derive(Debug, Clone)]
enum RetryOp {
    Enqueue(i64),
    Check(i64, i64),
    Remove(i64),
}

fn arb_retry_op() -> impl Strategy<Value = RetryOp> {
    prop_oneof![
        (1i64..=8).prop_map(RetryOp::Enqueue),
        (1i64..=8, 0i64..=4).prop_map(|(id, streak)| RetryOp::Check(id, streak)),
        (1i64..=8).prop_map(RetryOp::Remove),
    ]
}

fn apply_op(retry: &mut RetryQueue, op: &RetryOp) {
    match *op {
        RetryOp::Enqueue(id) => retry.enqueue(id, 2),
        RetryOp::Check(id, streak) => {
            retry.check_completion(id, streak);
        }
        RetryOp::Remove(id) => {
            retry.remove(id);
        }
    }
}

// ============================================================================
// Mastery
// ============================================================================

proptest! {
    #[test]
    fn prop_mastery_delta_follows_answer(progress in arb_progress(), correct in any::<bool>()) {
        let next = apply_answer(&progress, correct, fixed_now());

        let expected = if correct { progress.mastery + 1 } else { progress.mastery - 2 };
        prop_assert_eq!(next.mastery, expected);
        prop_assert_eq!(next.times_asked, progress.times_asked + 1);
        if correct {
            prop_assert_eq!(next.consecutive_correct, progress.consecutive_correct + 1);
            prop_assert_eq!(next.times_correct, progress.times_correct + 1);
        } else {
            prop_assert_eq!(next.consecutive_correct, 0);
            prop_assert_eq!(next.times_correct, progress.times_correct);
        }
    }

    #[test]
    fn prop_repeated_misses_have_no_floor(misses in 1usize..30) {
        let mut progress = WordProgress::new("pbt-user", 1, fixed_now());
        for _ in 0..misses {
            progress = apply_answer(&progress, false, fixed_now());
        }
        prop_assert_eq!(progress.mastery, -2 * misses as i64);
    }

    #[test]
    fn prop_review_interval_is_monotone(a in -50i64..50, b in -50i64..50) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(review_interval_days(low) <= review_interval_days(high));
        prop_assert!(review_interval_days(low) >= 1);
    }
}

// ============================================================================
// Retry queue
// ============================================================================

proptest! {
    #[test]
    fn prop_retry_queue_entries_stay_unique(ops in prop::collection::vec(arb_retry_op(), 0..40)) {
        let mut retry = RetryQueue::default();
        for op in &ops {
            apply_op(&mut retry, op);
        }

        let unique: HashSet<i64> = retry.word_ids().iter().copied().collect();
        prop_assert_eq!(unique.len(), retry.len());
        let keys: HashSet<i64> = retry.requirements().keys().copied().collect();
        prop_assert_eq!(keys, unique);
    }

    #[test]
    fn prop_enqueue_keeps_head(first in 1i64..=8, others in prop::collection::vec(1i64..=8, 0..10)) {
        let mut retry = RetryQueue::default();
        retry.enqueue(first, 2);
        for id in others {
            retry.enqueue(id, 2);
            prop_assert_eq!(retry.head(), Some(first));
        }
    }

    #[test]
    fn prop_check_completion_is_idempotent(id in 1i64..=8, streak in 0i64..=4) {
        let mut retry = RetryQueue::default();
        retry.enqueue(id, 2);

        let removed = retry.check_completion(id, streak);
        prop_assert_eq!(removed, streak >= 2);
        prop_assert_eq!(retry.contains(id), !removed);

        let snapshot = retry.clone();
        if removed {
            prop_assert!(!retry.check_completion(id, streak));
            prop_assert_eq!(retry, snapshot);
        }
    }

    #[test]
    fn prop_from_parts_drops_duplicates_and_orphans(
        queue in prop::collection::vec(1i64..=6, 0..12),
        orphan in 7i64..=9,
    ) {
        let mut requirements: BTreeMap<i64, i64> = queue.iter().map(|id| (*id, 2)).collect();
        requirements.insert(orphan, 3);

        let retry = RetryQueue::from_parts(queue.clone(), requirements);
        prop_assert_eq!(retry.head(), queue.first().copied());
        prop_assert!(!retry.requirements().contains_key(&orphan));
        let unique: HashSet<i64> = queue.iter().copied().collect();
        prop_assert_eq!(retry.len(), unique.len());
    }
}

// ============================================================================
// Group completion
// ============================================================================

proptest! {
    #[test]
    fn prop_group_completion_never_reverts(total in 0i64..40, mastered in 0i64..40) {
        let tally = GroupTally {
            words_total: total,
            words_started: mastered,
            words_mastered: mastered,
        };
        prop_assert_eq!(evaluate_transition(true, &tally), GroupTransition::AlreadyCompleted);

        let fresh = evaluate_transition(false, &tally);
        let expected = total > 0 && mastered >= total;
        prop_assert_eq!(fresh == GroupTransition::NewlyCompleted, expected);
    }
}

// ============================================================================
// Options
// ============================================================================

proptest! {
    #[test]
    fn prop_options_hold_correct_meaning_once(
        pool in prop::collection::vec("[a-e]{1,3}", 0..12),
        count in 2usize..6,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let options = build_options("zz", &pool, count, &mut rng);

        prop_assert!(options.len() <= count);
        prop_assert_eq!(options.iter().filter(|o| o.as_str() == "zz").count(), 1);
        let unique: HashSet<&String> = options.iter().collect();
        prop_assert_eq!(unique.len(), options.len());
    }
}
