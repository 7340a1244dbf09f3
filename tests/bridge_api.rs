//! Integration tests for the HTTP bridge, run against a real in-process
//! gRPC backend.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use http_body_util::BodyExt;
use rpc_bridge_prototype::grpc::BackendConfig;
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;

use common::{test_app, test_app_with};

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

/// Parse the JSON payloads of every complete SSE event in `buf`, ignoring
/// keep-alive comments and the trailing incomplete block.
fn sse_events(buf: &str) -> Vec<Value> {
    let mut blocks: Vec<&str> = buf.split("\n\n").collect();
    blocks.pop();

    blocks
        .iter()
        .flat_map(|block| block.lines())
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str(data.trim()).ok())
        .collect()
}

/// Read SSE body chunks until an event satisfies `pred`, returning every
/// event seen so far.
async fn read_sse_until(
    body: axum::body::Body,
    pred: impl Fn(&Value) -> bool,
) -> Vec<Value> {
    let mut stream = body.into_data_stream();
    let mut buf = String::new();

    loop {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for SSE data")
            .expect("SSE stream ended early")
            .expect("SSE body error");
        buf.push_str(std::str::from_utf8(&chunk).unwrap());

        let events = sse_events(&buf);
        if events.iter().any(&pred) {
            return events;
        }
    }
}

// ============================================================================
// Unary adapter
// ============================================================================

#[tokio::test]
async fn say_hello_returns_greeting() {
    let app = test_app().await;

    let (status, body) = post_json(app, "/sayHello", json!({"name": "World"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hello, World!");
}

#[tokio::test]
async fn say_hello_surfaces_backend_error_as_500() {
    let app = test_app().await;

    // The backend rejects an empty name.
    let (status, body) = post_json(app, "/sayHello", json!({"name": ""})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("name is required"));
}

// ============================================================================
// Server-stream collector
// ============================================================================

#[tokio::test]
async fn stream_greetings_collects_all_in_order() {
    let app = test_app().await;

    let (status, body) = get_json(app, "/api/stream-greetings?name=Fan").await;

    assert_eq!(status, StatusCode::OK);
    let greetings: Vec<&str> = body["greetings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g.as_str().unwrap())
        .collect();
    assert_eq!(
        greetings,
        vec![
            "Greeting #1 to Fan",
            "Greeting #2 to Fan",
            "Greeting #3 to Fan",
            "Greeting #4 to Fan",
            "Greeting #5 to Fan",
        ]
    );
}

#[tokio::test]
async fn stream_greetings_empty_stream_yields_empty_list() {
    let app = test_app_with(BackendConfig::builder().greeting_count(0).build()).await;

    let (status, body) = get_json(app, "/api/stream-greetings?name=Fan").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["greetings"], json!([]));
}

// ============================================================================
// Client-stream aggregator
// ============================================================================

#[tokio::test]
async fn add_numbers_returns_arithmetic_sum() {
    let app = test_app().await;

    let (status, body) = post_json(app, "/api/add-numbers", json!({"numbers": [1, 2, 3, 4, 5]})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sum"], 15);
}

#[tokio::test]
async fn add_numbers_empty_sequence_sums_to_zero() {
    let app = test_app().await;

    let (status, body) = post_json(app, "/api/add-numbers", json!({"numbers": []})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sum"], 0);
}

#[tokio::test]
async fn add_numbers_rejects_non_array() {
    let app = test_app().await;

    let (status, body) = post_json(app, "/api/add-numbers", json!({"numbers": "nope"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("array"));
}

#[tokio::test]
async fn add_numbers_rejects_missing_field() {
    let app = test_app().await;

    let (status, _) = post_json(app, "/api/add-numbers", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn add_numbers_rejects_non_integers() {
    let app = test_app().await;

    let (status, _) = post_json(app, "/api/add-numbers", json!({"numbers": [1, "two"]})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Chat send
// ============================================================================

#[tokio::test]
async fn chat_send_requires_client_id() {
    let app = test_app().await;

    let (status, body) = post_json(
        app,
        "/api/chat/send",
        json!({"sender": "alice", "message": "hi"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("clientId"));
}

#[tokio::test]
async fn chat_send_acknowledges_immediately() {
    let app = test_app().await;

    let (status, body) = post_json(
        app,
        "/api/chat/send",
        json!({"clientId": "alice", "sender": "alice", "message": "hi"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "sent");
}

// ============================================================================
// SSE pump
// ============================================================================

#[tokio::test]
async fn chat_stream_unknown_session_is_not_found() {
    let app = test_app().await;

    let (status, body) = get_json(app, "/api/chat/stream?clientId=ghost").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("no chat session"));
}

#[tokio::test]
async fn chat_stream_requires_client_id() {
    let app = test_app().await;

    let (status, _) = get_json(app, "/api/chat/stream").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_stream_delivers_backend_replies() {
    let app = test_app().await;

    let (status, _) = post_json(
        app.clone(),
        "/api/chat/send",
        json!({"clientId": "alice", "sender": "alice", "message": "hello"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/chat/stream?clientId=alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    let body = response.into_body();

    let (status, _) = post_json(
        app,
        "/api/chat/send",
        json!({"clientId": "alice", "sender": "alice", "message": "ping"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = read_sse_until(body, |event| {
        event["text"].as_str().unwrap_or("").contains("ping")
    })
    .await;

    let reply = events.last().unwrap();
    assert_eq!(reply["sender"], "Server");
    assert_eq!(reply["text"], "Server received: \"ping\"");
}

#[tokio::test]
async fn chat_sessions_are_independent() {
    let app = test_app().await;

    for (id, text) in [("alice", "from alice"), ("bob", "from bob")] {
        let (status, _) = post_json(
            app.clone(),
            "/api/chat/send",
            json!({"clientId": id, "sender": id, "message": text}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/chat/stream?clientId=alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response.into_body();

    let (status, _) = post_json(
        app.clone(),
        "/api/chat/send",
        json!({"clientId": "bob", "sender": "bob", "message": "bob again"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_json(
        app,
        "/api/chat/send",
        json!({"clientId": "alice", "sender": "alice", "message": "alice again"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = read_sse_until(body, |event| {
        event["text"].as_str().unwrap_or("").contains("alice again")
    })
    .await;

    // Nothing sent on bob's session may leak into alice's stream.
    assert!(
        events
            .iter()
            .all(|event| !event["text"].as_str().unwrap_or("").contains("bob"))
    );
}

#[tokio::test]
async fn chat_stream_preserves_emission_order() {
    let app = test_app().await;

    let (status, _) = post_json(
        app.clone(),
        "/api/chat/send",
        json!({"clientId": "alice", "sender": "alice", "message": "hello"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/chat/stream?clientId=alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response.into_body();

    for text in ["m1", "m2", "m3"] {
        let (status, _) = post_json(
            app.clone(),
            "/api/chat/send",
            json!({"clientId": "alice", "sender": "alice", "message": text}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let events = read_sse_until(body, |event| {
        event["text"].as_str().unwrap_or("").contains("m3")
    })
    .await;

    let ordered: Vec<&str> = events
        .iter()
        .filter_map(|event| event["text"].as_str())
        .filter(|text| text.contains("\"m"))
        .collect();
    assert_eq!(
        ordered,
        vec![
            "Server received: \"m1\"",
            "Server received: \"m2\"",
            "Server received: \"m3\"",
        ]
    );
}
