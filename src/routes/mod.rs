mod dashboard;
mod groups;
mod health;
mod quiz;
mod words;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::{json_error, AppError};
use crate::state::AppState;

pub const USER_HEADER: &str = "x-user-id";
pub const DEFAULT_USER: &str = "demo";
const MAX_USER_ID_LEN: usize = 64;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/quiz/sessions", quiz::router())
        .nest("/api/words", words::router())
        .nest("/api/groups", groups::router())
        .nest("/api/dashboard", dashboard::router())
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

/// Caller identity from the `x-user-id` header, `demo` when absent.
pub(crate) fn user_id(headers: &HeaderMap) -> Result<String, AppError> {
    let Some(raw) = headers.get(USER_HEADER) else {
        return Ok(DEFAULT_USER.to_string());
    };
    let value = raw
        .to_str()
        .map_err(|_| AppError::validation("x-user-id must be visible ASCII"))?
        .trim();
    if value.is_empty() || value.len() > MAX_USER_ID_LEN {
        return Err(AppError::validation(format!(
            "x-user-id must be 1-{MAX_USER_ID_LEN} characters"
        )));
    }
    Ok(value.to_string())
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
