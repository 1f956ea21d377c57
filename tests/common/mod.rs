#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vocab_quiz_backend::config::Config;
use vocab_quiz_backend::db::operations::{insert_word, NewWord};
use vocab_quiz_backend::db::Database;
use vocab_quiz_backend::services::quiz::QuizEngine;
use vocab_quiz_backend::state::AppState;

/// A throwaway database file. Keep the value alive for the whole test.
pub struct TestDb {
    _dir: TempDir,
    pub db: Database,
}

pub async fn create_test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::connect(&dir.path().join("quiz.db"))
        .await
        .expect("connect test db");
    TestDb { _dir: dir, db }
}

pub fn test_config(db: &TestDb) -> Config {
    Config {
        database_path: db.db.path().to_path_buf(),
        ..Config::default()
    }
}

pub fn create_test_app(db: &TestDb) -> Router {
    vocab_quiz_backend::build_router(AppState::new(db.db.clone(), test_config(db)))
}

pub fn engine(db: &TestDb) -> QuizEngine {
    QuizEngine::with_defaults(db.db.clone())
}

pub fn new_word(text: &str, meaning: &str, group_number: i64) -> NewWord {
    NewWord {
        word: text.to_string(),
        meaning: meaning.to_string(),
        group_number,
        ..Default::default()
    }
}

/// Inserts `count` words into `group_number`, returning their ids in order.
pub async fn seed_group(db: &TestDb, group_number: i64, count: usize) -> Vec<i64> {
    let mut conn = db.db.acquire().await.expect("acquire");
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let word = new_word(
            &format!("g{group_number}-word-{i}"),
            &format!("g{group_number}-meaning-{i}"),
            group_number,
        );
        ids.push(insert_word(&mut conn, &word, Utc::now()).await.expect("insert word"));
    }
    ids
}

pub fn meaning_of(group_number: i64, index: usize) -> String {
    format!("g{group_number}-meaning-{index}")
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response<Body> = app.clone().oneshot(request).await.expect("oneshot");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

pub fn get(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", user)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, user: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-user-id", user)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
