use sqlx::{Row, SqliteConnection};

use super::get_optional_date;
use crate::db::format_date;
use crate::quiz::streak::UserStreak;

/// Missing rows read as an empty streak.
pub async fn get_streak(conn: &mut SqliteConnection, user_id: &str) -> Result<UserStreak, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "user_streaks" WHERE "userId" = ? LIMIT 1"#)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(UserStreak::default());
    };
    Ok(UserStreak {
        current_streak: row.try_get("currentStreak")?,
        longest_streak: row.try_get("longestStreak")?,
        last_quiz_date: get_optional_date(&row, "lastQuizDate")?,
        total_quizzes: row.try_get("totalQuizzes")?,
    })
}

pub async fn save_streak(
    conn: &mut SqliteConnection,
    user_id: &str,
    streak: &UserStreak,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "user_streaks" ("userId", "currentStreak", "longestStreak", "lastQuizDate", "totalQuizzes")
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT ("userId") DO UPDATE SET
            "currentStreak" = excluded."currentStreak",
            "longestStreak" = excluded."longestStreak",
            "lastQuizDate" = excluded."lastQuizDate",
            "totalQuizzes" = excluded."totalQuizzes"
        "#,
    )
    .bind(user_id)
    .bind(streak.current_streak)
    .bind(streak.longest_streak)
    .bind(streak.last_quiz_date.map(format_date))
    .bind(streak.total_quizzes)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
