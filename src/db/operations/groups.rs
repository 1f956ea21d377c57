use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{get_flag, get_optional_timestamp, get_timestamp};
use crate::db::{format_timestamp, Upserted};
use crate::quiz::completion::DEFAULT_GROUP_MASTERY_THRESHOLD;
use crate::quiz::GroupProgress;

pub async fn get_group_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
    group_number: i64,
) -> Result<Option<GroupProgress>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT * FROM "group_progress" WHERE "userId" = ? AND "groupNumber" = ? LIMIT 1"#,
    )
    .bind(user_id)
    .bind(group_number)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(map_group_progress).transpose()
}

pub async fn get_or_create_group_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
    group_number: i64,
    now: DateTime<Utc>,
) -> Result<Upserted<GroupProgress>, sqlx::Error> {
    let now_str = format_timestamp(now);
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO "group_progress" (
            "userId", "groupNumber", "isCompleted", "masteryThreshold",
            "wordsTotal", "wordsStarted", "wordsMastered", "startedAt", "lastActivity"
        ) VALUES (?, ?, 0, ?, 0, 0, 0, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(group_number)
    .bind(DEFAULT_GROUP_MASTERY_THRESHOLD)
    .bind(&now_str)
    .bind(&now_str)
    .execute(&mut *conn)
    .await?;

    let created = result.rows_affected() > 0;
    let record = get_group_progress(conn, user_id, group_number)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    Ok(if created {
        Upserted::Created(record)
    } else {
        Upserted::Existing(record)
    })
}

/// Persists counters and completion. `isCompleted` is never written back to
/// false once set.
pub async fn save_group_progress(
    conn: &mut SqliteConnection,
    group: &GroupProgress,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE "group_progress" SET
            "isCompleted" = MAX("isCompleted", ?),
            "completedAt" = COALESCE("completedAt", ?),
            "masteryThreshold" = ?,
            "wordsTotal" = ?,
            "wordsStarted" = ?,
            "wordsMastered" = ?,
            "lastActivity" = ?
        WHERE "userId" = ? AND "groupNumber" = ?
        "#,
    )
    .bind(i64::from(group.is_completed))
    .bind(group.completed_at.map(format_timestamp))
    .bind(group.mastery_threshold)
    .bind(group.words_total)
    .bind(group.words_started)
    .bind(group.words_mastered)
    .bind(format_timestamp(group.last_activity))
    .bind(&group.user_id)
    .bind(group.group_number)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Lowest-numbered group the user has touched but not completed.
pub async fn first_incomplete_group(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<GroupProgress>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT * FROM "group_progress"
        WHERE "userId" = ? AND "isCompleted" = 0
        ORDER BY "groupNumber" ASC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(map_group_progress).transpose()
}

pub async fn count_completed_groups(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "group_progress" WHERE "userId" = ? AND "isCompleted" = 1"#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}

fn map_group_progress(row: &SqliteRow) -> Result<GroupProgress, sqlx::Error> {
    Ok(GroupProgress {
        user_id: row.try_get("userId")?,
        group_number: row.try_get("groupNumber")?,
        is_completed: get_flag(row, "isCompleted")?,
        completed_at: get_optional_timestamp(row, "completedAt")?,
        mastery_threshold: row.try_get("masteryThreshold")?,
        words_total: row.try_get("wordsTotal")?,
        words_started: row.try_get("wordsStarted")?,
        words_mastered: row.try_get("wordsMastered")?,
        started_at: get_timestamp(row, "startedAt")?,
        last_activity: get_timestamp(row, "lastActivity")?,
    })
}
