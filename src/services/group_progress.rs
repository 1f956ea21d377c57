use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::QuizError;
use crate::db::operations::{
    count_words_in_group, get_group_progress_records, get_or_create_group_progress,
    save_group_progress, save_progress,
};
use crate::quiz::mastery::schedule_review;
use crate::quiz::{evaluate_transition, GroupProgress, GroupTally, GroupTransition};

#[derive(Debug, Clone)]
pub struct GroupEvaluation {
    pub progress: GroupProgress,
    pub transition: GroupTransition,
}

/// Recounts a group's rollup for one user and applies the one-way
/// completion transition. On the transition every record at or above the
/// group threshold is rescheduled for review.
pub async fn evaluate_group(
    conn: &mut SqliteConnection,
    user_id: &str,
    group_number: i64,
    now: DateTime<Utc>,
) -> Result<GroupEvaluation, QuizError> {
    let mut group = get_or_create_group_progress(conn, user_id, group_number, now)
        .await?
        .into_inner();
    let threshold = group.mastery_threshold;

    let words_total = count_words_in_group(conn, group_number).await?;
    let records = get_group_progress_records(conn, user_id, group_number).await?;
    let tally = GroupTally {
        words_total,
        words_started: records.len() as i64,
        words_mastered: records.iter().filter(|p| p.mastery >= threshold).count() as i64,
    };

    let transition = evaluate_transition(group.is_completed, &tally);
    group.words_total = tally.words_total;
    group.words_started = tally.words_started;
    group.words_mastered = tally.words_mastered;
    group.last_activity = now;

    if transition == GroupTransition::NewlyCompleted {
        group.is_completed = true;
        group.completed_at = Some(now);
        for mut record in records.into_iter().filter(|p| p.mastery >= threshold) {
            schedule_review(&mut record, now);
            save_progress(conn, &record).await?;
        }
        tracing::info!(user_id, group_number, "group completed");
    }

    save_group_progress(conn, &group).await?;
    Ok(GroupEvaluation {
        progress: group,
        transition,
    })
}
