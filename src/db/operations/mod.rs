pub mod attempts;
pub mod groups;
pub mod progress;
pub mod sessions;
pub mod streaks;
pub mod words;

pub use attempts::*;
pub use groups::*;
pub use progress::*;
pub use sessions::*;
pub use streaks::*;
pub use words::*;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::db::{parse_date, parse_timestamp};

fn decode_error(column: &str, message: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: message.into(),
    }
}

pub(crate) fn get_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    parse_timestamp(&raw).ok_or_else(|| decode_error(column, format!("invalid timestamp: {raw}")))
}

pub(crate) fn get_optional_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    match raw {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| decode_error(column, format!("invalid timestamp: {raw}"))),
        None => Ok(None),
    }
}

pub(crate) fn get_optional_date(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<NaiveDate>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    Ok(raw.as_deref().and_then(parse_date))
}

pub(crate) fn get_flag(row: &SqliteRow, column: &str) -> Result<bool, sqlx::Error> {
    Ok(row.try_get::<i64, _>(column)? != 0)
}

pub(crate) fn get_json<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| decode_error(column, e.to_string()))
}

pub(crate) fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Protocol(e.to_string()))
}

/// Ids bound per `IN (...)` query; SQLite rejects statements past 32766
/// host parameters.
pub(crate) const ID_CHUNK: usize = 500;

/// `?, ?, ?` for an `IN (...)` list.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
