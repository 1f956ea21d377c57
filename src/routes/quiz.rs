use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user_id;
use crate::quiz::{QuizScope, QuizType};
use crate::response::{ok, AppError};
use crate::services::quiz::{AnswerSubmission, ScopeRequest};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
    #[serde(default)]
    quiz_type: Option<String>,
    #[serde(flatten)]
    scope: ScopeRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionResponse {
    session_id: String,
    quiz_type: QuizType,
    scope: QuizScope,
    started_at: DateTime<Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_session))
        .route("/:sessionId", get(session_detail))
        .route("/:sessionId/next", get(next_question))
        .route("/:sessionId/answers", post(submit_answer))
        .route("/:sessionId/complete", post(complete_session))
}

async fn start_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<StartSessionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user = user_id(&headers)?;
    // a bodiless POST starts an unscoped session
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(JsonRejection::MissingJsonContentType(_)) => StartSessionRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };

    let quiz_type = match payload.quiz_type.as_deref() {
        None => QuizType::default(),
        Some(raw) => QuizType::parse(raw.trim())
            .ok_or_else(|| AppError::validation(format!("unknown quizType: {raw}")))?,
    };

    let session = state
        .engine()
        .start_session(&user, quiz_type, payload.scope.into_scope())
        .await?;

    Ok((
        StatusCode::CREATED,
        ok(StartSessionResponse {
            session_id: session.id,
            quiz_type: session.quiz_type,
            scope: session.scope,
            started_at: session.started_at,
        }),
    ))
}

async fn session_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = user_id(&headers)?;
    let detail = state.engine().session_detail(&user, &session_id).await?;
    Ok(ok(detail))
}

async fn next_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = user_id(&headers)?;
    let next = state.engine().next_question(&user, &session_id).await?;
    Ok(ok(next))
}

async fn submit_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    payload: Result<Json<AnswerSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user = user_id(&headers)?;
    let Json(submission) = payload?;
    let result = state
        .engine()
        .submit_answer(&user, &session_id, submission)
        .await?;
    Ok(ok(result))
}

async fn complete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = user_id(&headers)?;
    let report = state.engine().complete_session(&user, &session_id).await?;
    Ok(ok(report))
}
