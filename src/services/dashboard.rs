use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;

use super::group_progress::evaluate_group;
use super::QuizError;
use crate::db::operations::{
    completed_session_stats, count_active_sessions, count_completed_groups, count_due_reviews,
    count_low_mastery, count_user_attempts, due_review_word_ids, first_incomplete_group, get_streak, list_groups, low_mastery_word_ids,
    mastery_distribution, MasteryDistribution, SessionStats,
};
use crate::db::Database;
use crate::quiz::report::{recommend, Recommendation, RecommendationSignals};
use crate::quiz::streak::UserStreak;
use crate::quiz::GroupProgress;

/// Mastery at or below this counts as a low-mastery word.
pub const LOW_MASTERY_CEILING: i64 = 0;
const WORD_ID_SAMPLE: i64 = 20;
const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallProgress {
    pub groups_completed: i64,
    pub total_groups: i64,
    pub total_words: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordIdSample {
    pub count: i64,
    pub word_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGroup {
    #[serde(flatten)]
    pub progress: GroupProgress,
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub user_id: String,
    pub overall_progress: OverallProgress,
    pub mastery_distribution: MasteryDistribution,
    pub due_reviews: WordIdSample,
    pub low_mastery: WordIdSample,
    pub current_group: Option<CurrentGroup>,
    pub recent_performance: SessionStats,
    pub active_sessions: i64,
    pub total_attempts: i64,
    pub streak: UserStreak,
    pub next_actions: Vec<Recommendation>,
}

/// Existence checks behind the recommended next actions.
pub async fn recommendation_signals(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<RecommendationSignals, sqlx::Error> {
    Ok(RecommendationSignals {
        due_count: count_due_reviews(conn, user_id, now).await?,
        due_word_ids: due_review_word_ids(conn, user_id, now, WORD_ID_SAMPLE).await?,
        low_mastery_count: count_low_mastery(conn, user_id, LOW_MASTERY_CEILING).await?,
        low_mastery_word_ids: low_mastery_word_ids(conn, user_id, LOW_MASTERY_CEILING, WORD_ID_SAMPLE)
            .await?,
        next_group: first_incomplete_group(conn, user_id)
            .await?
            .map(|g| g.group_number),
    })
}

pub async fn dashboard(db: &Database, user_id: &str) -> Result<Dashboard, QuizError> {
    let now = Utc::now();
    let mut tx = db.begin().await?;

    let groups = list_groups(&mut tx).await?;
    let total_words = groups.iter().map(|g| g.total_words).sum();

    let current_group = match first_incomplete_group(&mut tx, user_id).await? {
        Some(group) => {
            let evaluation = evaluate_group(&mut tx, user_id, group.group_number, now).await?;
            let completion_percentage = evaluation.progress.completion_percentage();
            Some(CurrentGroup {
                progress: evaluation.progress,
                completion_percentage,
            })
        }
        None => None,
    };

    let signals = recommendation_signals(&mut tx, user_id, now).await?;
    let dashboard = Dashboard {
        user_id: user_id.to_string(),
        overall_progress: OverallProgress {
            groups_completed: count_completed_groups(&mut tx, user_id).await?,
            total_groups: groups.len() as i64,
            total_words,
        },
        mastery_distribution: mastery_distribution(&mut tx, user_id).await?,
        due_reviews: WordIdSample {
            count: signals.due_count,
            word_ids: signals.due_word_ids.clone(),
        },
        low_mastery: WordIdSample {
            count: signals.low_mastery_count,
            word_ids: signals.low_mastery_word_ids.clone(),
        },
        current_group,
        recent_performance: completed_session_stats(
            &mut tx,
            user_id,
            now - Duration::days(RECENT_WINDOW_DAYS),
        )
        .await?,
        active_sessions: count_active_sessions(&mut tx, user_id).await?,
        total_attempts: count_user_attempts(&mut tx, user_id).await?,
        streak: get_streak(&mut tx, user_id).await?,
        next_actions: recommend(&signals),
    };

    tx.commit().await?;
    Ok(dashboard)
}
