//! Tests for the REST interface.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use hard_to_get::{
    AppState, BroadcastNotifier, Corpus, GameEngine, GameRules, MemoryRecorder, RandomSource,
    router,
};

fn app() -> Router {
    let notifier = Arc::new(BroadcastNotifier::new(16));
    let engine = GameEngine::new(
        Corpus::builtin(),
        GameRules::default(),
        RandomSource::seeded(5),
        notifier.clone(),
        Arc::new(MemoryRecorder::new()),
    )
    .expect("Engine failed");
    router(AppState::new(Arc::new(engine), notifier))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, model: &str) -> String {
    let (status, body) = call(app, "POST", "/register", Some(json!({ "model_name": model }))).await;
    assert_eq!(status, StatusCode::OK);
    body["client_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_full_round_over_http() {
    let app = app();
    let w = register(&app, "alpha").await;
    let d = register(&app, "beta").await;

    let (status, first) = call(
        &app,
        "POST",
        "/join_game",
        Some(json!({ "client_id": w, "preferred_role": "Witness" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["role"], "Witness");
    assert_eq!(first["session_ready"], false);
    assert_eq!(first["board"].as_array().unwrap().len(), 16);
    let session_id = first["session_id"].as_str().unwrap().to_string();

    let (_, second) = call(&app, "POST", "/join_game", Some(json!({ "client_id": d }))).await;
    assert_eq!(second["role"], "Detective");
    assert_eq!(second["session_ready"], true);

    let (status, turn) = call(
        &app,
        "GET",
        &format!("/sessions/{}/turn/{}", session_id, w),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(turn["phase"], "witness");
    assert_eq!(turn["round"], 1);
    let key_word = turn["key_word"].as_str().unwrap().to_string();
    let choice = turn["dilemma"][0].as_str().unwrap().to_string();

    let (status, receipt) = call(
        &app,
        "POST",
        "/witness_choice",
        Some(json!({ "session_id": session_id, "client_id": w, "choice": choice })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["status"], "success");

    let (_, turn) = call(&app, "GET", &format!("/sessions/{}/turn/{}", session_id, d), None).await;
    assert_eq!(turn["phase"], "detective");
    assert_eq!(turn["witness_choice"], choice);

    let decoy = first["board"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .find(|word| *word != key_word)
        .unwrap()
        .to_string();
    let (status, report) = call(
        &app,
        "POST",
        "/detective_choice",
        Some(json!({ "session_id": session_id, "client_id": d, "eliminated_words": [decoy] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["game_over"], false);
    assert_eq!(report["win"], Value::Null);
    assert_eq!(report["remaining_words"].as_array().unwrap().len(), 15);

    let (status, view) = call(&app, "GET", &format!("/sessions/{}", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "active");
    assert_eq!(view["current_round"], 2);
    assert_eq!(view["key_word"], Value::Null);
}

#[tokio::test]
async fn test_unknown_client_is_bad_request() {
    let app = app();
    let (status, body) = call(
        &app,
        "POST",
        "/join_game",
        Some(json!({ "client_id": "ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_client");
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn test_unknown_session_is_conflict() {
    let app = app();
    let (status, body) = call(&app, "GET", "/sessions/nope", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_session_state");
}

#[tokio::test]
async fn test_invalid_move_is_unprocessable() {
    let app = app();
    let w = register(&app, "alpha").await;
    let d = register(&app, "beta").await;
    let (_, joined) = call(
        &app,
        "POST",
        "/join_game",
        Some(json!({ "client_id": w, "preferred_role": "witness" })),
    )
    .await;
    call(&app, "POST", "/join_game", Some(json!({ "client_id": d }))).await;
    let session_id = joined["session_id"].as_str().unwrap();

    let (status, body) = call(
        &app,
        "POST",
        "/witness_choice",
        Some(json!({ "session_id": session_id, "client_id": w, "choice": "Neither" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_move");
}

#[tokio::test]
async fn test_event_stream_requires_registration() {
    let app = app();
    let (status, body) = call(&app, "GET", "/events/ghost", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_client");
}

#[tokio::test]
async fn test_register_without_model_name() {
    let app = app();
    let (status, body) = call(&app, "POST", "/register", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let client_id = body["client_id"].as_str().unwrap();
    assert!(!client_id.is_empty());
}

#[tokio::test]
async fn test_join_accepts_capitalized_role() {
    let app = app();
    let d = register(&app, "gamma").await;
    let (status, joined) = call(
        &app,
        "POST",
        "/join_game",
        Some(json!({ "client_id": d, "preferred_role": "Detective" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["role"], "Detective");
    assert_eq!(joined["session_ready"], false);
}
