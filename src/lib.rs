pub mod config;
pub mod db;
pub mod logging;
pub mod quiz;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{Database, DbInitError};
use crate::state::AppState;

/// Opens the database named by `config` and returns the full router.
pub async fn create_app(config: Config) -> Result<axum::Router, DbInitError> {
    let db = Database::connect(&config.database_path).await?;
    Ok(build_router(AppState::new(db, config)))
}

pub fn build_router(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
