use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::db::Database;
use crate::services::quiz::QuizEngine;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_utc: DateTime<Utc>,
    db: Database,
    engine: Arc<QuizEngine>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let engine = Arc::new(QuizEngine::new(db.clone(), config.option_count));
        Self {
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
            db,
            engine,
            config: Arc::new(config),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at_utc
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn engine(&self) -> Arc<QuizEngine> {
        Arc::clone(&self.engine)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
