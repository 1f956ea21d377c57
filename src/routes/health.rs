use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::db::format_timestamp;
use crate::db::sqlite_schema::SCHEMA_VERSION;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(database_health))
        .route("/live", get(liveness))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseHealth {
    status: &'static str,
    database: &'static str,
    schema_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Liveness {
    status: &'static str,
    timestamp: String,
    start_time: String,
    uptime: u64,
    version: &'static str,
}

/// 200 while the store answers a ping, 503 otherwise.
async fn database_health(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let ping = state.db().ping().await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let (status_code, status, database) = match ping {
        Ok(()) => (StatusCode::OK, "ok", "connected"),
        Err(err) => {
            tracing::warn!(error = %err, "health check database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "disconnected")
        }
    };

    let body = DatabaseHealth {
        status,
        database,
        schema_version: SCHEMA_VERSION,
        latency_ms: status_code.is_success().then_some(latency_ms),
        timestamp: format_timestamp(Utc::now()),
    };
    (status_code, Json(body)).into_response()
}

async fn liveness(State(state): State<AppState>) -> Json<Liveness> {
    Json(Liveness {
        status: "healthy",
        timestamp: format_timestamp(Utc::now()),
        start_time: format_timestamp(state.started_at()),
        uptime: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
