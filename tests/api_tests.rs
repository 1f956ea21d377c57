use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{create_test_app, create_test_db, delete, get, post_json, send, test_config};

const USER: &str = "api-user";

async fn ingest(app: &axum::Router, body: Value) -> (StatusCode, Value) {
    send(app, post_json("/api/words/bulk", USER, body)).await
}

#[tokio::test]
async fn test_health_endpoints() {
    let db = create_test_db().await;
    let app = create_test_app(&db);

    let (status, body) = send(&app, get("/health", USER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
    assert_eq!(body["schemaVersion"], "1.0.0");

    let (status, body) = send(&app, get("/health/live", USER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_app_opens_configured_database() {
    let db = create_test_db().await;
    let app = vocab_quiz_backend::create_app(test_config(&db))
        .await
        .expect("create app");

    let (status, body) = send(&app, get("/api/groups", USER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["groups"], json!([]));
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let db = create_test_db().await;
    let app = create_test_app(&db);

    let (status, body) = send(&app, get("/api/nope", USER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_bulk_ingest_reports_partial_failures() {
    let db = create_test_db().await;
    let app = create_test_app(&db);

    let (status, body) = ingest(
        &app,
        json!([
            { "word": "lucid", "meaning": "clear", "examples": [{ "text": "A lucid essay." }] },
            { "word": "LUCID", "meaning": "duplicate" },
            { "meaning": "no word" },
            { "word": "terse", "meaning": "brief", "examples": [{ "text": "" }] },
            { "word": "opaque", "meaning": "not transparent", "groupNumber": 4 }
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    let added = body["data"]["added"].as_array().unwrap();
    let failed = body["data"]["failed"].as_array().unwrap();
    assert_eq!(added.len(), 2);
    assert_eq!(added[0]["word"], "lucid");
    assert_eq!(added[0]["groupNumber"], 1);
    assert_eq!(added[1]["groupNumber"], 4);

    let reasons: Vec<&str> = failed.iter().map(|f| f["reason"].as_str().unwrap()).collect();
    assert_eq!(
        reasons,
        vec!["Word already exists", "Missing 'word' field", "Invalid field(s)"]
    );

    let (status, _) = ingest(&app, json!({ "word": "candid", "meaning": "frank" })).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_bulk_ingest_assigns_groups_by_size() {
    let db = create_test_db().await;
    let app = create_test_app(&db);

    let words: Vec<Value> = (0..31)
        .map(|i| json!({ "word": format!("w{i}"), "meaning": format!("m{i}") }))
        .collect();
    let (status, body) = ingest(&app, Value::Array(words)).await;
    assert_eq!(status, StatusCode::CREATED);

    let added = body["data"]["added"].as_array().unwrap();
    assert_eq!(added[29]["groupNumber"], 1);
    assert_eq!(added[30]["groupNumber"], 2);
}

#[tokio::test]
async fn test_quiz_round_trip_over_http() {
    let db = create_test_db().await;
    let app = create_test_app(&db);
    ingest(
        &app,
        json!([
            { "word": "lucid", "meaning": "clear", "groupNumber": 1 },
            { "word": "terse", "meaning": "brief", "groupNumber": 1 }
        ]),
    )
    .await;

    let (status, body) = send(
        &app,
        post_json("/api/quiz/sessions", USER, json!({ "groupNumber": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["quizType"], "adaptive_group");
    assert_eq!(body["data"]["scope"]["kind"], "group");
    assert_eq!(body["data"]["scope"]["groupNumber"], 1);
    let session_id = body["data"]["sessionId"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get(&format!("/api/quiz/sessions/{session_id}/next"), USER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "question");
    let word_id = body["data"]["wordId"].as_i64().unwrap();
    let options = body["data"]["options"].as_array().unwrap();
    assert_eq!(options.len(), 2);

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/quiz/sessions/{session_id}/answers"),
            USER,
            json!({ "wordId": word_id, "answer": "definitely wrong", "timeTakenMs": 800 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCorrect"], false);
    assert_eq!(body["data"]["masteryAfter"], -2);
    assert_eq!(body["data"]["retryStatus"]["addedToRetry"], true);

    let (_, body) = send(&app, get(&format!("/api/quiz/sessions/{session_id}/next"), USER)).await;
    assert_eq!(body["data"]["wordId"], word_id);
    assert_eq!(body["data"]["isRetry"], true);

    let (status, body) = send(
        &app,
        post_json(&format!("/api/quiz/sessions/{session_id}/complete"), USER, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["performance"]["totalQuestions"], 1);
    assert_eq!(body["data"]["retryQueueRemaining"], 1);

    let (status, body) = send(&app, get(&format!("/api/quiz/sessions/{session_id}"), USER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], false);
    assert_eq!(body["data"]["attempts"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/quiz/sessions/{session_id}/answers"),
            USER,
            json!({ "wordId": word_id, "answer": "clear" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_error_envelopes() {
    let db = create_test_db().await;
    let app = create_test_app(&db);

    let (status, body) = send(
        &app,
        post_json("/api/quiz/sessions", USER, json!({ "wordIds": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SCOPE");

    let (status, body) = send(
        &app,
        post_json("/api/quiz/sessions", USER, json!({ "quizType": "speed_round" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, get("/api/quiz/sessions/unknown/next", USER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(
        &app,
        post_json("/api/quiz/sessions/unknown/answers", USER, json!({ "answer": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let long_user = "u".repeat(65);
    let (status, _) = send(&app, get("/api/dashboard", &long_user)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_words_listing_read_and_delete() {
    let db = create_test_db().await;
    let app = create_test_app(&db);
    let (_, body) = ingest(
        &app,
        json!([
            { "word": "lucid", "meaning": "clear", "groupNumber": 1 },
            { "word": "terse", "meaning": "brief", "groupNumber": 1 },
            { "word": "opaque", "meaning": "not transparent", "groupNumber": 2 }
        ]),
    )
    .await;
    let lucid = body["data"]["added"][0]["id"].as_i64().unwrap();

    let (status, body) = send(&app, get("/api/words?group=1&limit=1", USER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["words"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["total"], 2);
    assert_eq!(body["data"]["pagination"]["hasMore"], true);

    let (status, body) = send(
        &app,
        post_json(&format!("/api/words/{lucid}/read"), USER, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["firstSeen"], true);
    let (_, body) = send(
        &app,
        post_json(&format!("/api/words/{lucid}/read"), USER, json!({})),
    )
    .await;
    assert_eq!(body["data"]["firstSeen"], false);

    let (_, body) = send(&app, get("/api/words?masteryMax=0", USER)).await;
    let ids: Vec<i64> = body["data"]["words"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![lucid]);

    let (_, body) = send(&app, get("/api/groups", USER)).await;
    let groups = body["data"]["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["totalWords"], 2);
    assert_eq!(groups[0]["wordsStarted"], 1);

    let (status, _) = send(&app, delete(&format!("/api/words/{lucid}"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, get(&format!("/api/words/{lucid}"), USER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_dashboard_summarises_user_state() {
    let db = create_test_db().await;
    let app = create_test_app(&db);
    let (_, body) = ingest(
        &app,
        json!([
            { "word": "lucid", "meaning": "clear", "groupNumber": 1 },
            { "word": "terse", "meaning": "brief", "groupNumber": 1 }
        ]),
    )
    .await;
    let lucid = body["data"]["added"][0]["id"].as_i64().unwrap();

    let (_, body) = send(
        &app,
        post_json("/api/quiz/sessions", USER, json!({ "wordIds": [lucid] })),
    )
    .await;
    let session_id = body["data"]["sessionId"].as_str().unwrap().to_string();
    send(
        &app,
        post_json(
            &format!("/api/quiz/sessions/{session_id}/answers"),
            USER,
            json!({ "wordId": lucid, "answer": "murky" }),
        ),
    )
    .await;
    send(
        &app,
        post_json(&format!("/api/quiz/sessions/{session_id}/complete"), USER, json!({})),
    )
    .await;

    let (status, body) = send(&app, get("/api/dashboard", USER)).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["overallProgress"]["totalGroups"], 1);
    assert_eq!(data["overallProgress"]["groupsCompleted"], 0);
    assert_eq!(data["masteryDistribution"]["struggling"], 1);
    assert_eq!(data["masteryDistribution"]["totalStudied"], 1);
    assert_eq!(data["lowMastery"]["count"], 1);
    assert_eq!(data["lowMastery"]["wordIds"], json!([lucid]));
    assert_eq!(data["currentGroup"]["groupNumber"], 1);
    assert_eq!(data["recentPerformance"]["sessionsCompleted"], 1);
    assert_eq!(data["activeSessions"], 0);
    assert_eq!(data["totalAttempts"], 1);
    assert_eq!(data["streak"]["currentStreak"], 1);
    assert_eq!(data["nextActions"][0]["action"], "low_mastery_drill");

    let (_, other) = send(&app, get("/api/dashboard", "someone-else")).await;
    assert_eq!(other["data"]["masteryDistribution"]["totalStudied"], 0);
    assert!(other["data"]["currentGroup"].is_null());
}
