use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use super::user_id;
use crate::response::{ok, AppError};
use crate::services::words::{groups_with_progress, GroupSummary};
use crate::state::AppState;

#[derive(Serialize)]
struct GroupsResponse {
    groups: Vec<GroupSummary>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_groups))
}

async fn list_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = user_id(&headers)?;
    let groups = groups_with_progress(state.db(), &user).await?;
    Ok(ok(GroupsResponse { groups }))
}
