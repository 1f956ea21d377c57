use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use super::user_id;
use crate::response::{ok, AppError};
use crate::services::words::{self, WordCriteria};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_words))
        .route("/bulk", post(add_words_bulk))
        .route("/:wordId", get(get_word).delete(delete_word))
        .route("/:wordId/read", post(mark_read))
}

async fn list_words(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<WordCriteria>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user = user_id(&headers)?;
    let Query(criteria) = query?;
    let listing = words::list_words(state.db(), &user, &criteria).await?;
    Ok(ok(listing))
}

/// 201 when every entry landed, 207 when some were rejected.
async fn add_words_bulk(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let report = words::add_words_bulk(state.db(), payload, state.config().group_size).await?;
    let status = if report.failed.is_empty() {
        StatusCode::CREATED
    } else {
        StatusCode::MULTI_STATUS
    };
    Ok((status, ok(report)))
}

async fn get_word(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(word_id) = path?;
    let word = words::get_word_by_id(state.db(), word_id).await?;
    Ok(ok(word))
}

async fn delete_word(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(word_id) = path?;
    words::remove_word(state.db(), word_id).await?;
    Ok(ok(serde_json::json!({ "deleted": true, "wordId": word_id })))
}

async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(word_id) = path?;
    let user = user_id(&headers)?;
    let result = words::mark_word_read(state.db(), &user, word_id).await?;
    Ok(ok(result))
}
