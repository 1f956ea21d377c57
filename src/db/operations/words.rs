use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{get_json, get_timestamp, placeholders, to_json, ID_CHUNK};
use crate::db::format_timestamp;
use crate::quiz::{Word, WordExample};

const WORD_ORDER: &str = r#"ORDER BY "groupNumber" ASC, "createdAt" ASC, "id" ASC"#;

/// Content accepted by ingestion; everything but `word`, `meaning` and
/// `groupNumber` has a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWord {
    pub word: String,
    pub meaning: String,
    pub group_number: i64,
    #[serde(default)]
    pub pronunciation: String,
    #[serde(default)]
    pub story_mnemonic: String,
    #[serde(default)]
    pub etymology: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
    #[serde(default)]
    pub examples: Vec<WordExample>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

pub async fn insert_word(
    conn: &mut SqliteConnection,
    word: &NewWord,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO "words" (
            "word", "pronunciation", "meaning", "groupNumber", "storyMnemonic",
            "etymology", "category", "difficultyLevel", "synonyms", "antonyms",
            "examples", "tags", "source", "createdAt"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(word.word.trim())
    .bind(&word.pronunciation)
    .bind(&word.meaning)
    .bind(word.group_number)
    .bind(&word.story_mnemonic)
    .bind(&word.etymology)
    .bind(word.category.as_deref().unwrap_or("vocabulary"))
    .bind(word.difficulty_level.as_deref().unwrap_or("medium"))
    .bind(to_json(&word.synonyms)?)
    .bind(to_json(&word.antonyms)?)
    .bind(to_json(&word.examples)?)
    .bind(to_json(&word.tags)?)
    .bind(word.source.as_deref().unwrap_or("Unknown"))
    .bind(format_timestamp(now))
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_word(conn: &mut SqliteConnection, word_id: i64) -> Result<Option<Word>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "words" WHERE "id" = ? LIMIT 1"#)
        .bind(word_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(map_word).transpose()
}

pub async fn get_words_by_ids(
    conn: &mut SqliteConnection,
    word_ids: &[i64],
) -> Result<Vec<Word>, sqlx::Error> {
    let mut words = Vec::with_capacity(word_ids.len());
    for chunk in word_ids.chunks(ID_CHUNK) {
        let sql = format!(
            r#"SELECT * FROM "words" WHERE "id" IN ({})"#,
            placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(*id);
        }
        for row in &query.fetch_all(&mut *conn).await? {
            words.push(map_word(row)?);
        }
    }
    // chunks come back separately; restore WORD_ORDER
    words.sort_by(|a, b| {
        (a.group_number, a.created_at, a.id).cmp(&(b.group_number, b.created_at, b.id))
    });
    words.dedup_by_key(|w| w.id);
    Ok(words)
}

pub async fn get_words_by_group(
    conn: &mut SqliteConnection,
    group_number: i64,
) -> Result<Vec<Word>, sqlx::Error> {
    let sql = format!(r#"SELECT * FROM "words" WHERE "groupNumber" = ? {WORD_ORDER}"#);
    let rows = sqlx::query(&sql)
        .bind(group_number)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(map_word).collect()
}

pub async fn get_all_words(conn: &mut SqliteConnection) -> Result<Vec<Word>, sqlx::Error> {
    let sql = format!(r#"SELECT * FROM "words" {WORD_ORDER}"#);
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    rows.iter().map(map_word).collect()
}

pub async fn count_words(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM "words""#)
        .fetch_one(&mut *conn)
        .await
}

pub async fn count_words_in_group(
    conn: &mut SqliteConnection,
    group_number: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM "words" WHERE "groupNumber" = ?"#)
        .bind(group_number)
        .fetch_one(&mut *conn)
        .await
}

pub async fn word_text_exists(conn: &mut SqliteConnection, text: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i64> =
        sqlx::query_scalar(r#"SELECT "id" FROM "words" WHERE "word" = ? COLLATE NOCASE LIMIT 1"#)
            .bind(text.trim())
            .fetch_optional(&mut *conn)
            .await?;
    Ok(found.is_some())
}

pub async fn delete_word(conn: &mut SqliteConnection, word_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "words" WHERE "id" = ?"#)
        .bind(word_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Global analytics counters, owned by the word and never merged into
/// per-user progress.
pub async fn increment_word_counters(
    conn: &mut SqliteConnection,
    word_id: i64,
    is_correct: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE "words"
        SET "totalAttempts" = "totalAttempts" + 1,
            "totalCorrect" = "totalCorrect" + ?
        WHERE "id" = ?
        "#,
    )
    .bind(i64::from(is_correct))
    .bind(word_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSize {
    pub group_number: i64,
    pub total_words: i64,
}

pub async fn list_groups(conn: &mut SqliteConnection) -> Result<Vec<GroupSize>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "groupNumber", COUNT(*) AS "totalWords"
        FROM "words"
        GROUP BY "groupNumber"
        ORDER BY "groupNumber" ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(GroupSize {
                group_number: row.try_get("groupNumber")?,
                total_words: row.try_get("totalWords")?,
            })
        })
        .collect()
}

/// Random meanings from other words, used as multiple-choice distractors.
pub async fn sample_distractor_meanings(
    conn: &mut SqliteConnection,
    exclude_word_id: i64,
    limit: i64,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT "meaning" FROM "words"
        WHERE "id" != ? AND TRIM("meaning") != ''
        ORDER BY RANDOM()
        LIMIT ?
        "#,
    )
    .bind(exclude_word_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
}

fn map_word(row: &SqliteRow) -> Result<Word, sqlx::Error> {
    Ok(Word {
        id: row.try_get("id")?,
        word: row.try_get("word")?,
        pronunciation: row.try_get("pronunciation")?,
        meaning: row.try_get("meaning")?,
        group_number: row.try_get("groupNumber")?,
        story_mnemonic: row.try_get("storyMnemonic")?,
        etymology: row.try_get("etymology")?,
        category: row.try_get("category")?,
        difficulty_level: row.try_get("difficultyLevel")?,
        synonyms: get_json(row, "synonyms")?,
        antonyms: get_json(row, "antonyms")?,
        examples: get_json(row, "examples")?,
        tags: get_json(row, "tags")?,
        total_attempts: row.try_get("totalAttempts")?,
        total_correct: row.try_get("totalCorrect")?,
        source: row.try_get("source")?,
        created_at: get_timestamp(row, "createdAt")?,
    })
}
