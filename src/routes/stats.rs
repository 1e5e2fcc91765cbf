// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard statistics routes.

use crate::error::Result;
use crate::models::{GlobalStats, RecordView};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/stats/{user_id}", get(get_user_stats))
}

/// Event-wide counts, recomputed on every request.
async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<GlobalStats>> {
    Ok(Json(state.tracker.global_stats().await?))
}

/// One participant's record by Discord user ID; `null` if unknown.
async fn get_user_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Option<RecordView>>> {
    let record = state.tracker.find_by_user_id(&user_id).await?;
    Ok(Json(record.map(RecordView::from)))
}
