use std::collections::HashSet;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{get_flag, get_json, get_timestamp, to_json};
use crate::db::format_timestamp;
use crate::quiz::{NewQuizAttempt, QuizAttempt};

/// Appends to the attempt ledger. Attempts are never updated afterwards.
pub async fn insert_attempt(
    conn: &mut SqliteConnection,
    attempt: &NewQuizAttempt,
) -> Result<QuizAttempt, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO "quiz_attempts" (
            "sessionId", "wordId", "userAnswer", "correctAnswer", "isCorrect",
            "isRetryAttempt", "masteryBefore", "masteryAfter",
            "consecutiveCorrectBefore", "consecutiveCorrectAfter",
            "timeTakenMs", "questionOrder", "optionsPresented", "timestamp"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&attempt.session_id)
    .bind(attempt.word_id)
    .bind(&attempt.user_answer)
    .bind(&attempt.correct_answer)
    .bind(i64::from(attempt.is_correct))
    .bind(i64::from(attempt.is_retry_attempt))
    .bind(attempt.mastery_before)
    .bind(attempt.mastery_after)
    .bind(attempt.consecutive_correct_before)
    .bind(attempt.consecutive_correct_after)
    .bind(attempt.time_taken_ms)
    .bind(attempt.question_order)
    .bind(to_json(&attempt.options_presented)?)
    .bind(format_timestamp(attempt.timestamp))
    .execute(&mut *conn)
    .await?;

    Ok(QuizAttempt {
        id: result.last_insert_rowid(),
        session_id: attempt.session_id.clone(),
        word_id: attempt.word_id,
        user_answer: attempt.user_answer.clone(),
        correct_answer: attempt.correct_answer.clone(),
        is_correct: attempt.is_correct,
        is_retry_attempt: attempt.is_retry_attempt,
        mastery_before: attempt.mastery_before,
        mastery_after: attempt.mastery_after,
        consecutive_correct_before: attempt.consecutive_correct_before,
        consecutive_correct_after: attempt.consecutive_correct_after,
        time_taken_ms: attempt.time_taken_ms,
        question_order: attempt.question_order,
        options_presented: attempt.options_presented.clone(),
        timestamp: attempt.timestamp,
    })
}

/// Attempts in the order they were asked.
pub async fn list_session_attempts(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "quiz_attempts"
        WHERE "sessionId" = ?
        ORDER BY "questionOrder" ASC, "id" ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(map_attempt).collect()
}

pub async fn attempted_word_ids(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<HashSet<i64>, sqlx::Error> {
    let ids: Vec<i64> =
        sqlx::query_scalar(r#"SELECT DISTINCT "wordId" FROM "quiz_attempts" WHERE "sessionId" = ?"#)
            .bind(session_id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(ids.into_iter().collect())
}

pub async fn count_user_attempts(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "quiz_attempts" a
        JOIN "quiz_sessions" s ON s."id" = a."sessionId"
        WHERE s."userId" = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}

fn map_attempt(row: &SqliteRow) -> Result<QuizAttempt, sqlx::Error> {
    Ok(QuizAttempt {
        id: row.try_get("id")?,
        session_id: row.try_get("sessionId")?,
        word_id: row.try_get("wordId")?,
        user_answer: row.try_get("userAnswer")?,
        correct_answer: row.try_get("correctAnswer")?,
        is_correct: get_flag(row, "isCorrect")?,
        is_retry_attempt: get_flag(row, "isRetryAttempt")?,
        mastery_before: row.try_get("masteryBefore")?,
        mastery_after: row.try_get("masteryAfter")?,
        consecutive_correct_before: row.try_get("consecutiveCorrectBefore")?,
        consecutive_correct_after: row.try_get("consecutiveCorrectAfter")?,
        time_taken_ms: row.try_get("timeTakenMs")?,
        question_order: row.try_get("questionOrder")?,
        options_presented: get_json(row, "optionsPresented")?,
        timestamp: get_timestamp(row, "timestamp")?,
    })
}
