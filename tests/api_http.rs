// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - POST /chat (local answer, invalid content, chat persistence)
// - POST /chat/new + GET /chat/{id}/history
// - GET /stats
// - GET /health (disabled gateway)
// - GET /admin/reload-answers

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    http::Request,
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use campus_assistant::analytics::Analytics;
use campus_assistant::api::{create_router, AppState};
use campus_assistant::gateway::{DynProvider, FallbackGateway, MockProvider};
use campus_assistant::lookup::{LookupEntry, LookupHandle, LookupTable};
use campus_assistant::rate_limit::RateLimiter;
use campus_assistant::resolver::ResponseResolver;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn entry(q: &str, a: &str) -> LookupEntry {
    LookupEntry {
        question: q.to_string(),
        answer: a.to_string(),
    }
}

/// Build the same Router the binary uses, with an injectable provider.
fn test_router(provider: Option<DynProvider>) -> Router {
    let lookup = LookupHandle::new(LookupTable::new(vec![
        entry("library hours", "8 to 9"),
        entry("hello", "Hello! Ask me about campus."),
    ]));
    let gateway = Arc::new(FallbackGateway::with_provider(
        provider,
        RateLimiter::per_minute(30),
        Duration::from_millis(200),
    ));
    let analytics = Arc::new(Analytics::new());
    let resolver = Arc::new(ResponseResolver::new(
        lookup.clone(),
        gateway.clone(),
        analytics.clone(),
        2000,
    ));
    let state = AppState::with_components(
        resolver,
        gateway,
        analytics,
        lookup,
        std::env::temp_dir().join("campus-assistant-test-answers.json"),
    );
    create_router(state)
}

fn disabled_router() -> Router {
    test_router(None)
}

fn mock_router(reply: &str) -> Router {
    test_router(Some(Arc::new(MockProvider {
        fixed: reply.to_string(),
    })))
}

async fn post_json(app: Router, uri: &str, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request");

    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");

    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

#[tokio::test]
async fn chat_answers_from_the_table() {
    let app = disabled_router();

    let (status, v) = post_json(app, "/chat", json!({ "content": "library hours" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["content"], "8 to 9");
    assert_eq!(v["role"], "assistant");
    assert!(v["time"].as_str().is_some(), "missing 'time'");
    assert!(v.get("chatId").is_none(), "chatId absent when not sent");
}

#[tokio::test]
async fn chat_with_non_string_content_returns_fixed_reply() {
    let app = mock_router("should never be used");

    let (status, v) = post_json(app, "/chat", json!({ "content": 42 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        v["content"],
        "Invalid message format. Please send a text message."
    );
    assert_eq!(v["role"], "assistant");
}

#[tokio::test]
async fn chat_with_missing_content_returns_fixed_reply() {
    let app = disabled_router();

    let (status, v) = post_json(app, "/chat", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        v["content"],
        "Invalid message format. Please send a text message."
    );
}

#[tokio::test]
async fn chat_persists_turns_into_an_existing_chat() {
    let app = disabled_router();

    let (status, created) = post_json(app.clone(), "/chat/new", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let chat_id = created["chatId"].as_str().expect("chatId").to_string();

    let (status, reply) = post_json(
        app.clone(),
        "/chat",
        json!({ "content": "hello", "chatId": chat_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["chatId"], chat_id.as_str());

    let (status, history) = get_json(app, &format!("/chat/{chat_id}/history")).await;
    assert_eq!(status, StatusCode::OK);
    let turns = history.as_array().expect("history array");
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["role"], "user");
    assert_eq!(turns[0]["content"], "hello");
    assert_eq!(turns[1]["role"], "assistant");
    assert_eq!(turns[1]["content"], "Hello! Ask me about campus.");
}

#[tokio::test]
async fn unknown_chat_id_never_blocks_the_answer() {
    let app = disabled_router();

    let (status, v) = post_json(
        app.clone(),
        "/chat",
        json!({ "content": "hello", "chatId": "chat-404" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["content"], "Hello! Ask me about campus.");

    let (status, _) = get_json(app, "/chat/chat-404/history").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_reflect_recorded_outcomes() {
    let app = mock_router("a remote answer");

    let (_, _) = post_json(app.clone(), "/chat", json!({ "content": "library hours" })).await;
    let (_, _) = post_json(app.clone(), "/chat", json!({ "content": "unmatched" })).await;

    let (status, v) = get_json(app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["analytics"]["total"], 2);
    assert_eq!(v["analytics"]["counts"]["local"], 1);
    assert_eq!(v["analytics"]["counts"]["remote"], 1);
    assert_eq!(v["gateway"]["enabled"], true);
    assert_eq!(v["gateway"]["requests_in_last_minute"], 1);
    assert_eq!(v["gateway"]["rate_limit_per_minute"], 30);
    assert_eq!(v["answer_entries"], 2);
}

#[tokio::test]
async fn health_reports_disabled_gateway() {
    let app = disabled_router();

    let (status, v) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "disabled");
    assert!(v["message"].as_str().is_some());
}

#[tokio::test]
async fn admin_reload_swaps_the_table_from_disk() {
    let path = std::env::temp_dir().join("campus-assistant-test-answers.json");
    std::fs::write(
        &path,
        serde_json::to_string(&vec![
            entry("new question", "new answer"),
            entry("second", "2"),
            entry("third", "3"),
        ])
        .expect("serialize table"),
    )
    .expect("write temp answers");

    let app = disabled_router();

    let req = Request::builder()
        .method("GET")
        .uri("/admin/reload-answers")
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let text = String::from_utf8(bytes).expect("utf8");
    assert_eq!(text, "reloaded (3 entries)");

    let (_, v) = post_json(app, "/chat", json!({ "content": "new question" })).await;
    assert_eq!(v["content"], "new answer");
}
