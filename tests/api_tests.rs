// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP API tests against an in-memory store.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use enigma_tracker::services::Notification;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::create_test_app;

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body).into_owned())
        })
    };
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn login(app: &axum::Router, id: &str, username: &str) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/auth/login",
            json!({ "id": id, "username": username, "avatar": "abc123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_root_and_health() {
    let (app, _, _) = create_test_app();

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Hello World!".to_string()));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_login_returns_same_token_for_same_user() {
    let (app, _, notifier) = create_test_app();

    let first = login(&app, "1001", "alice").await;
    let second = login(&app, "1001", "alice").await;

    assert_eq!(first.len(), 16);
    assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(first, second);

    // Only the first login announces a new participant
    let started = notifier
        .sent()
        .into_iter()
        .filter(|n| matches!(n, Notification::Started { .. }))
        .count();
    assert_eq!(started, 1);
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let (app, _, _) = create_test_app();

    let (status, _) = send(&app, post_json("/auth/login", json!({ "id": "1" }))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_login_accepts_numeric_id() {
    let (app, _, _) = create_test_app();

    let (status, body) = send(
        &app,
        post_json(
            "/auth/login",
            json!({ "id": 1, "username": "a", "avatar": "x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    // Same user as the string form
    assert_eq!(login(&app, "1", "a").await, token);

    let (_, body) = send(&app, get(&format!("/users/{}", token))).await;
    assert_eq!(body["userData"]["userId"], "1");
}

#[tokio::test]
async fn test_login_stores_avatar_url() {
    let (app, _, _) = create_test_app();

    let (_, body) = send(
        &app,
        post_json(
            "/auth/login",
            json!({ "id": "2002", "username": "bob", "avatar": "a_animated" }),
        ),
    )
    .await;
    let token = body["token"].as_str().unwrap();

    let (_, body) = send(&app, get(&format!("/users/{}", token))).await;
    assert_eq!(
        body["userData"]["avatarURL"],
        "https://cdn.discordapp.com/avatars/2002/a_animated.gif"
    );

    let (_, body) = send(
        &app,
        post_json(
            "/auth/login",
            json!({ "id": "2003", "username": "carol", "avatar": null }),
        ),
    )
    .await;
    let token = body["token"].as_str().unwrap();

    let (_, body) = send(&app, get(&format!("/users/{}", token))).await;
    assert_eq!(
        body["userData"]["avatarURL"],
        "https://cdn.discordapp.com/embed/avatars/0.png"
    );
}

#[tokio::test]
async fn test_verify_token() {
    let (app, _, _) = create_test_app();
    let token = login(&app, "1001", "alice").await;

    let (status, body) = send(&app, get(&format!("/auth/verify/{}", token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "isValid": true }));

    let (_, body) = send(&app, get("/auth/verify/bogus")).await;
    assert_eq!(body, json!({ "isValid": false }));
}

#[tokio::test]
async fn test_user_data_for_unknown_token_is_null() {
    let (app, _, _) = create_test_app();

    let (status, body) = send(&app, get("/users/bogus")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "userData": null }));
}

#[tokio::test]
async fn test_full_run_to_completion() {
    let (app, _, notifier) = create_test_app();
    let token = login(&app, "1001", "alice").await;

    let (_, body) = send(&app, get(&format!("/users/{}", token))).await;
    assert_eq!(body["userData"]["step"], 1);
    assert_eq!(body["userData"]["completed"], false);
    assert!(body["userData"].get("giftCode").is_none());

    for expected_step in 2..=10 {
        let (_, body) = send(&app, post(&format!("/nextstep/{}", token))).await;
        assert_eq!(body, json!({ "success": true }));

        let (_, body) = send(&app, get(&format!("/users/{}", token))).await;
        assert_eq!(body["userData"]["step"], expected_step);
        assert_eq!(body["userData"]["completed"], false);
    }

    // The call made on the last step completes the run
    let (_, body) = send(&app, post(&format!("/nextstep/{}", token))).await;
    assert_eq!(body, json!({ "success": true }));

    let (_, body) = send(&app, get(&format!("/users/{}", token))).await;
    assert_eq!(body["userData"]["step"], 10);
    assert_eq!(body["userData"]["completed"], true);
    assert_eq!(body["userData"]["giftCode"].as_str().unwrap().len(), 19);
    assert!(body["userData"]["completedAt"].is_string());

    assert_eq!(notifier.roles_granted(), vec!["1001".to_string()]);

    let (_, body) = send(&app, get("/stats")).await;
    assert_eq!(
        body,
        json!({
            "completed": 1,
            "total": 1,
            "steps": [{ "step": 10, "count": 1 }]
        })
    );
}

#[tokio::test]
async fn test_next_step_unknown_token() {
    let (app, _, notifier) = create_test_app();

    let (status, body) = send(&app, post("/nextstep/bogus")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false }));
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_stats_counts_per_step() {
    let (app, _, _) = create_test_app();
    let alice = login(&app, "1", "alice").await;
    login(&app, "2", "bob").await;
    login(&app, "3", "carol").await;

    send(&app, post(&format!("/nextstep/{}", alice))).await;

    let (status, body) = send(&app, get("/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], 0);
    assert_eq!(body["total"], 3);

    let steps = body["steps"].as_array().unwrap();
    let count_at = |step: u64| {
        steps
            .iter()
            .find(|s| s["step"] == step)
            .map(|s| s["count"].as_u64().unwrap())
            .unwrap_or(0)
    };
    assert_eq!(count_at(1), 2);
    assert_eq!(count_at(2), 1);
}

#[tokio::test]
async fn test_stats_for_empty_event() {
    let (app, _, _) = create_test_app();

    let (_, body) = send(&app, get("/stats")).await;
    assert_eq!(body, json!({ "completed": 0, "total": 0, "steps": [] }));
}

#[tokio::test]
async fn test_user_stats_by_user_id() {
    let (app, _, _) = create_test_app();
    login(&app, "1001", "alice").await;

    let (status, body) = send(&app, get("/stats/1001")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], "1001");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["step"], 1);
    // No token or unearned gift code in the public view
    assert!(body.get("giftCode").is_none());
    assert!(body.get("dataToken").is_none());

    let (status, body) = send(&app, get("/stats/9999")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend() {
    let (app, state, _) = create_test_app();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/stats")
        .header(header::ORIGIN, state.config.frontend_url.as_str())
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        state.config.frontend_url.as_str()
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _, _) = create_test_app();

    let (status, _) = send(&app, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
