use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{decode_error, get_flag, get_json, get_optional_timestamp, get_timestamp, to_json};
use crate::db::format_timestamp;
use crate::quiz::{QuizSession, QuizType, RetryQueue};

pub async fn insert_session(
    conn: &mut SqliteConnection,
    session: &QuizSession,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "quiz_sessions" (
            "id", "userId", "quizType", "scope", "startedAt", "completedAt",
            "isActive", "totalQuestions", "correctAnswers", "wordsMasteredThisSession",
            "groupCompleted", "retryQueue", "retryRequirements"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(session.quiz_type.as_str())
    .bind(to_json(&session.scope)?)
    .bind(format_timestamp(session.started_at))
    .bind(session.completed_at.map(format_timestamp))
    .bind(i64::from(session.is_active))
    .bind(session.total_questions)
    .bind(session.correct_answers)
    .bind(session.words_mastered_this_session)
    .bind(i64::from(session.group_completed))
    .bind(to_json(session.retry.word_ids())?)
    .bind(to_json(session.retry.requirements())?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_session(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Option<QuizSession>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "quiz_sessions" WHERE "id" = ? LIMIT 1"#)
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(map_session).transpose()
}

/// Sessions are private to their owner; another user's id reads as absent.
pub async fn get_session_for_user(
    conn: &mut SqliteConnection,
    session_id: &str,
    user_id: &str,
) -> Result<Option<QuizSession>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT * FROM "quiz_sessions" WHERE "id" = ? AND "userId" = ? LIMIT 1"#,
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(map_session).transpose()
}

/// Writes the mutable session state: counters, retry queue and lifecycle flags.
pub async fn save_session(
    conn: &mut SqliteConnection,
    session: &QuizSession,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE "quiz_sessions" SET
            "completedAt" = ?,
            "isActive" = ?,
            "totalQuestions" = ?,
            "correctAnswers" = ?,
            "wordsMasteredThisSession" = ?,
            "groupCompleted" = ?,
            "retryQueue" = ?,
            "retryRequirements" = ?
        WHERE "id" = ?
        "#,
    )
    .bind(session.completed_at.map(format_timestamp))
    .bind(i64::from(session.is_active))
    .bind(session.total_questions)
    .bind(session.correct_answers)
    .bind(session.words_mastered_this_session)
    .bind(i64::from(session.group_completed))
    .bind(to_json(session.retry.word_ids())?)
    .bind(to_json(session.retry.requirements())?)
    .bind(&session.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub sessions_completed: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub words_mastered: i64,
    pub average_accuracy: f64,
}

/// Aggregates over completed sessions started at or after `since`.
pub async fn completed_session_stats(
    conn: &mut SqliteConnection,
    user_id: &str,
    since: DateTime<Utc>,
) -> Result<SessionStats, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS "sessionsCompleted",
            COALESCE(SUM("totalQuestions"), 0) AS "totalQuestions",
            COALESCE(SUM("correctAnswers"), 0) AS "correctAnswers",
            COALESCE(SUM("wordsMasteredThisSession"), 0) AS "wordsMastered"
        FROM "quiz_sessions"
        WHERE "userId" = ? AND "completedAt" IS NOT NULL AND "startedAt" >= ?
        "#,
    )
    .bind(user_id)
    .bind(format_timestamp(since))
    .fetch_one(&mut *conn)
    .await?;

    let total_questions: i64 = row.try_get("totalQuestions")?;
    let correct_answers: i64 = row.try_get("correctAnswers")?;
    Ok(SessionStats {
        sessions_completed: row.try_get("sessionsCompleted")?,
        total_questions,
        correct_answers,
        words_mastered: row.try_get("wordsMastered")?,
        average_accuracy: crate::quiz::percentage(correct_answers, total_questions),
    })
}

pub async fn count_active_sessions(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "quiz_sessions" WHERE "userId" = ? AND "isActive" = 1"#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}

fn map_session(row: &SqliteRow) -> Result<QuizSession, sqlx::Error> {
    let quiz_type: String = row.try_get("quizType")?;
    let quiz_type = QuizType::parse(&quiz_type)
        .ok_or_else(|| decode_error("quizType", format!("unknown quiz type: {quiz_type}")))?;
    let queue: Vec<i64> = get_json(row, "retryQueue")?;
    let requirements: BTreeMap<i64, i64> = get_json(row, "retryRequirements")?;

    Ok(QuizSession {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        quiz_type,
        scope: get_json(row, "scope")?,
        started_at: get_timestamp(row, "startedAt")?,
        completed_at: get_optional_timestamp(row, "completedAt")?,
        is_active: get_flag(row, "isActive")?,
        total_questions: row.try_get("totalQuestions")?,
        correct_answers: row.try_get("correctAnswers")?,
        words_mastered_this_session: row.try_get("wordsMasteredThisSession")?,
        group_completed: get_flag(row, "groupCompleted")?,
        retry: RetryQueue::from_parts(queue, requirements),
    })
}
