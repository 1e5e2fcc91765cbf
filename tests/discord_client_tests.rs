// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discord client tests against a local mock of the REST API.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use enigma_tracker::config::DiscordConfig;
use enigma_tracker::services::{DiscordNotifier, Notification, Notifier, Participant};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const GUILD_ID: &str = "guild-1";
const LOGS_CHANNEL_ID: &str = "chan-1";
const BOT_TOKEN: &str = "test-bot-token";

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Message {
        channel_id: String,
        content: String,
    },
    RoleGrant {
        guild_id: String,
        user_id: String,
        role_id: String,
    },
}

#[derive(Default)]
struct MockDiscord {
    /// channel id -> guild id
    channels: HashMap<String, String>,
    calls: Mutex<Vec<Call>>,
    unauthorized: Mutex<usize>,
}

impl MockDiscord {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bot {}", BOT_TOKEN);
        let ok = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected);
        if !ok {
            *self.unauthorized.lock().unwrap() += 1;
        }
        ok
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

async fn get_channel(
    State(mock): State<Arc<MockDiscord>>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if !mock.authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let guild_id = mock.channels.get(&channel_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({ "id": channel_id, "guild_id": guild_id, "type": 0 })))
}

async fn create_message(
    State(mock): State<Arc<MockDiscord>>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if !mock.authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let content = body["content"].as_str().unwrap_or_default().to_string();
    mock.calls.lock().unwrap().push(Call::Message {
        channel_id: channel_id.clone(),
        content: content.clone(),
    });
    Ok(Json(json!({ "id": "msg-1", "channel_id": channel_id, "content": content })))
}

async fn add_member_role(
    State(mock): State<Arc<MockDiscord>>,
    Path((guild_id, user_id, role_id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> StatusCode {
    if !mock.authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    mock.calls.lock().unwrap().push(Call::RoleGrant {
        guild_id,
        user_id,
        role_id,
    });
    StatusCode::NO_CONTENT
}

/// Serve the mock on an ephemeral port and return its base URL.
async fn spawn_mock(mock: Arc<MockDiscord>) -> String {
    let app = Router::new()
        .route("/channels/{channel_id}", get(get_channel))
        .route("/channels/{channel_id}/messages", post(create_message))
        .route(
            "/guilds/{guild_id}/members/{user_id}/roles/{role_id}",
            put(add_member_role),
        )
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn mock_with_channel(channel_id: &str, guild_id: &str) -> Arc<MockDiscord> {
    let mut mock = MockDiscord::default();
    mock.channels
        .insert(channel_id.to_string(), guild_id.to_string());
    Arc::new(mock)
}

fn notifier(api_url: String, completion_role_id: Option<&str>) -> DiscordNotifier {
    DiscordNotifier::new(&DiscordConfig {
        bot_token: BOT_TOKEN.to_string(),
        guild_id: GUILD_ID.to_string(),
        logs_channel_id: LOGS_CHANNEL_ID.to_string(),
        completion_role_id: completion_role_id.map(str::to_string),
        api_url,
    })
}

fn started() -> Notification {
    Notification::Started {
        participant: Participant {
            user_id: "42".to_string(),
            username: "alice".to_string(),
        },
        participants: 3,
    }
}

#[tokio::test]
async fn test_send_posts_to_logs_channel() {
    let mock = mock_with_channel(LOGS_CHANNEL_ID, GUILD_ID);
    let notifier = notifier(spawn_mock(mock.clone()).await, None);

    notifier.send(&started()).await.unwrap();

    assert_eq!(
        mock.calls(),
        vec![Call::Message {
            channel_id: LOGS_CHANNEL_ID.to_string(),
            content: started().message(),
        }]
    );
    assert_eq!(*mock.unauthorized.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_missing_channel_drops_message() {
    let mock = Arc::new(MockDiscord::default());
    let notifier = notifier(spawn_mock(mock.clone()).await, None);

    notifier.send(&started()).await.unwrap();

    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_channel_in_other_guild_drops_message() {
    let mock = mock_with_channel(LOGS_CHANNEL_ID, "some-other-guild");
    let notifier = notifier(spawn_mock(mock.clone()).await, None);

    notifier.send(&started()).await.unwrap();

    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_grant_completion_role() {
    let mock = mock_with_channel(LOGS_CHANNEL_ID, GUILD_ID);
    let notifier = notifier(spawn_mock(mock.clone()).await, Some("role-9"));

    notifier.grant_completion_role("42").await.unwrap();

    assert_eq!(
        mock.calls(),
        vec![Call::RoleGrant {
            guild_id: GUILD_ID.to_string(),
            user_id: "42".to_string(),
            role_id: "role-9".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_no_completion_role_is_noop() {
    let mock = mock_with_channel(LOGS_CHANNEL_ID, GUILD_ID);
    let notifier = notifier(spawn_mock(mock.clone()).await, None);

    notifier.grant_completion_role("42").await.unwrap();

    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_api_errors_surface() {
    let mock = mock_with_channel(LOGS_CHANNEL_ID, GUILD_ID);
    let base_url = spawn_mock(mock.clone()).await;
    let notifier = DiscordNotifier::new(&DiscordConfig {
        bot_token: "wrong-token".to_string(),
        guild_id: GUILD_ID.to_string(),
        logs_channel_id: LOGS_CHANNEL_ID.to_string(),
        completion_role_id: Some("role-9".to_string()),
        api_url: base_url,
    });

    assert!(notifier.send(&started()).await.is_err());
    assert!(notifier.grant_completion_role("42").await.is_err());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_unreachable_api_is_error() {
    // Nothing listens on port 9 locally
    let notifier = notifier("http://127.0.0.1:9".to_string(), None);

    assert!(notifier.send(&started()).await.is_err());
}
