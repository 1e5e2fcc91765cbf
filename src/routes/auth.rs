// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login and token verification routes.
//!
//! The frontend completes Discord OAuth itself and posts the resulting user
//! fields here; we answer with the participant's data token.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/verify/{token}", get(verify))
}

/// Discord user fields sent by the frontend after OAuth.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Discord user ID; numeric IDs are kept as their decimal text
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub username: String,
    /// Avatar hash; Discord sends null for users without one
    #[serde(default)]
    pub avatar: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(id) => id,
        Id::Number(id) => id.to_string(),
    })
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VerifyResponse {
    pub is_valid: bool,
}

/// Avatar URL on the Discord CDN; animated (`a_`) avatars are GIFs.
pub fn avatar_url(cdn_url: &str, user_id: &str, avatar: Option<&str>) -> String {
    let cdn_url = cdn_url.trim_end_matches('/');
    match avatar {
        Some(avatar) => {
            let format = if avatar.starts_with("a_") { "gif" } else { "jpg" };
            format!("{}/avatars/{}/{}.{}", cdn_url, user_id, avatar, format)
        }
        None => format!("{}/embed/avatars/0.png", cdn_url),
    }
}

/// Log in: reuse the participant's token or create their record.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let avatar = avatar_url(
        &state.config.avatar_cdn_url,
        &body.id,
        body.avatar.as_deref(),
    );

    let token = state
        .tracker
        .login(&body.id, &body.username, &avatar)
        .await?;

    Ok(Json(LoginResponse { token }))
}

async fn verify(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<VerifyResponse>> {
    let is_valid = state.tracker.is_token_valid(&token).await?;
    Ok(Json(VerifyResponse { is_valid }))
}
