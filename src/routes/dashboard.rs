use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use super::user_id;
use crate::response::{ok, AppError};
use crate::services::dashboard::dashboard;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_dashboard))
}

async fn get_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = user_id(&headers)?;
    let summary = dashboard(state.db(), &user).await?;
    Ok(ok(summary))
}
