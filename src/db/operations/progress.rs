use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{get_flag, get_optional_timestamp, get_timestamp, placeholders, ID_CHUNK};
use crate::db::{format_timestamp, Upserted};
use crate::quiz::WordProgress;

pub async fn get_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
    word_id: i64,
) -> Result<Option<WordProgress>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT * FROM "word_progress" WHERE "userId" = ? AND "wordId" = ? LIMIT 1"#,
    )
    .bind(user_id)
    .bind(word_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(map_progress).transpose()
}

/// Idempotent upsert keyed by (user, word); new records start at mastery 0.
pub async fn get_or_create_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
    word_id: i64,
    now: DateTime<Utc>,
) -> Result<Upserted<WordProgress>, sqlx::Error> {
    let fresh = WordProgress::new(user_id, word_id, now);
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO "word_progress" (
            "userId", "wordId", "mastery", "timesAsked", "timesCorrect",
            "consecutiveCorrect", "firstSeen", "lastPracticed", "dueDate",
            "intervalDays", "isLearning", "markedForReview"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?)
        "#,
    )
    .bind(&fresh.user_id)
    .bind(fresh.word_id)
    .bind(fresh.mastery)
    .bind(fresh.times_asked)
    .bind(fresh.times_correct)
    .bind(fresh.consecutive_correct)
    .bind(format_timestamp(fresh.first_seen))
    .bind(format_timestamp(fresh.last_practiced))
    .bind(fresh.interval_days)
    .bind(i64::from(fresh.is_learning))
    .bind(i64::from(fresh.marked_for_review))
    .execute(&mut *conn)
    .await?;

    let created = result.rows_affected() > 0;
    let record = get_progress(conn, user_id, word_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    Ok(if created {
        Upserted::Created(record)
    } else {
        Upserted::Existing(record)
    })
}

/// Writes the whole record in one statement.
pub async fn save_progress(
    conn: &mut SqliteConnection,
    progress: &WordProgress,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "word_progress" (
            "userId", "wordId", "mastery", "timesAsked", "timesCorrect",
            "consecutiveCorrect", "firstSeen", "lastPracticed", "dueDate",
            "intervalDays", "isLearning", "markedForReview"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT ("userId", "wordId") DO UPDATE SET
            "mastery" = excluded."mastery",
            "timesAsked" = excluded."timesAsked",
            "timesCorrect" = excluded."timesCorrect",
            "consecutiveCorrect" = excluded."consecutiveCorrect",
            "lastPracticed" = excluded."lastPracticed",
            "dueDate" = excluded."dueDate",
            "intervalDays" = excluded."intervalDays",
            "isLearning" = excluded."isLearning",
            "markedForReview" = excluded."markedForReview"
        "#,
    )
    .bind(&progress.user_id)
    .bind(progress.word_id)
    .bind(progress.mastery)
    .bind(progress.times_asked)
    .bind(progress.times_correct)
    .bind(progress.consecutive_correct)
    .bind(format_timestamp(progress.first_seen))
    .bind(format_timestamp(progress.last_practiced))
    .bind(progress.due_date.map(format_timestamp))
    .bind(progress.interval_days)
    .bind(i64::from(progress.is_learning))
    .bind(i64::from(progress.marked_for_review))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_progress_for_words(
    conn: &mut SqliteConnection,
    user_id: &str,
    word_ids: &[i64],
) -> Result<HashMap<i64, WordProgress>, sqlx::Error> {
    let mut out = HashMap::new();
    for chunk in word_ids.chunks(ID_CHUNK) {
        let sql = format!(
            r#"SELECT * FROM "word_progress" WHERE "userId" = ? AND "wordId" IN ({})"#,
            placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql).bind(user_id);
        for id in chunk {
            query = query.bind(*id);
        }
        for row in &query.fetch_all(&mut *conn).await? {
            let progress = map_progress(row)?;
            out.insert(progress.word_id, progress);
        }
    }
    Ok(out)
}

pub async fn get_group_progress_records(
    conn: &mut SqliteConnection,
    user_id: &str,
    group_number: i64,
) -> Result<Vec<WordProgress>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT p.* FROM "word_progress" p
        JOIN "words" w ON w."id" = p."wordId"
        WHERE p."userId" = ? AND w."groupNumber" = ?
        ORDER BY p."wordId" ASC
        "#,
    )
    .bind(user_id)
    .bind(group_number)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(map_progress).collect()
}

pub async fn count_due_reviews(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "word_progress"
        WHERE "userId" = ? AND "markedForReview" = 1
          AND "dueDate" IS NOT NULL AND "dueDate" <= ?
        "#,
    )
    .bind(user_id)
    .bind(format_timestamp(now))
    .fetch_one(&mut *conn)
    .await
}

pub async fn due_review_word_ids(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT "wordId" FROM "word_progress"
        WHERE "userId" = ? AND "markedForReview" = 1
          AND "dueDate" IS NOT NULL AND "dueDate" <= ?
        ORDER BY "dueDate" ASC, "wordId" ASC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(format_timestamp(now))
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
}

pub async fn count_low_mastery(
    conn: &mut SqliteConnection,
    user_id: &str,
    max_mastery: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "word_progress" WHERE "userId" = ? AND "mastery" <= ?"#,
    )
    .bind(user_id)
    .bind(max_mastery)
    .fetch_one(&mut *conn)
    .await
}

pub async fn low_mastery_word_ids(
    conn: &mut SqliteConnection,
    user_id: &str,
    max_mastery: i64,
    limit: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT "wordId" FROM "word_progress"
        WHERE "userId" = ? AND "mastery" <= ?
        ORDER BY "mastery" ASC, "wordId" ASC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(max_mastery)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryDistribution {
    pub struggling: i64,
    pub learning: i64,
    pub practicing: i64,
    pub mastered: i64,
    pub total_studied: i64,
}

pub async fn mastery_distribution(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<MasteryDistribution, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN "mastery" < 0 THEN 1 ELSE 0 END), 0) AS "struggling",
            COALESCE(SUM(CASE WHEN "mastery" BETWEEN 0 AND 2 THEN 1 ELSE 0 END), 0) AS "learning",
            COALESCE(SUM(CASE WHEN "mastery" BETWEEN 3 AND 5 THEN 1 ELSE 0 END), 0) AS "practicing",
            COALESCE(SUM(CASE WHEN "mastery" >= 6 THEN 1 ELSE 0 END), 0) AS "mastered",
            COUNT(*) AS "totalStudied"
        FROM "word_progress"
        WHERE "userId" = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(MasteryDistribution {
        struggling: row.try_get("struggling")?,
        learning: row.try_get("learning")?,
        practicing: row.try_get("practicing")?,
        mastered: row.try_get("mastered")?,
        total_studied: row.try_get("totalStudied")?,
    })
}

fn map_progress(row: &SqliteRow) -> Result<WordProgress, sqlx::Error> {
    Ok(WordProgress {
        user_id: row.try_get("userId")?,
        word_id: row.try_get("wordId")?,
        mastery: row.try_get("mastery")?,
        times_asked: row.try_get("timesAsked")?,
        times_correct: row.try_get("timesCorrect")?,
        consecutive_correct: row.try_get("consecutiveCorrect")?,
        first_seen: get_timestamp(row, "firstSeen")?,
        last_practiced: get_timestamp(row, "lastPracticed")?,
        due_date: get_optional_timestamp(row, "dueDate")?,
        interval_days: row.try_get("intervalDays")?,
        is_learning: get_flag(row, "isLearning")?,
        marked_for_review: get_flag(row, "markedForReview")?,
    })
}
