// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Participant routes, addressed by data token.

use crate::error::Result;
use crate::models::RecordView;
use crate::services::token;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/{data_token}", get(get_user))
        .route("/nextstep/{data_token}", post(next_step))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserDataResponse {
    pub user_data: Option<RecordView>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NextStepResponse {
    pub success: bool,
}

/// Participant record; `null` for an unknown token.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(data_token): Path<String>,
) -> Result<Json<UserDataResponse>> {
    let user_data = state
        .tracker
        .user_data(&data_token)
        .await?
        .map(RecordView::from);

    Ok(Json(UserDataResponse { user_data }))
}

/// Advance the participant; unknown tokens get `success: false`.
async fn next_step(
    State(state): State<Arc<AppState>>,
    Path(data_token): Path<String>,
) -> Result<Json<NextStepResponse>> {
    if !state.tracker.is_token_valid(&data_token).await? {
        tracing::debug!(token = %token::redact(&data_token), "Next step for unknown token");
        return Ok(Json(NextStepResponse { success: false }));
    }

    let success = match state.tracker.advance_step(&data_token).await {
        Ok(success) => success,
        Err(e) if e.is_not_found() => false,
        Err(e) => return Err(e),
    };

    Ok(Json(NextStepResponse { success }))
}
