// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use enigma_tracker::config::Config;
use enigma_tracker::db::{FirestoreStore, SqliteStore};
use enigma_tracker::routes::create_router;
use enigma_tracker::services::{ProgressTracker, RecordingNotifier};
use enigma_tracker::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Connect to the Firestore emulator.
#[allow(dead_code)]
pub async fn test_store() -> FirestoreStore {
    FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Tracker over a fresh in-memory store.
#[allow(dead_code)]
pub fn test_tracker(step_count: u32) -> (ProgressTracker, Arc<RecordingNotifier>) {
    let store = Arc::new(SqliteStore::open_in_memory().expect("Failed to open in-memory store"));
    let notifier = Arc::new(RecordingNotifier::new());
    let tracker = ProgressTracker::new(store, notifier.clone(), step_count);
    (tracker, notifier)
}

/// Create a test app over an in-memory store.
/// Returns the router, the shared state and the notifier it records into.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<RecordingNotifier>) {
    let config = Config::test_default();
    let (tracker, notifier) = test_tracker(config.step_count);

    let state = Arc::new(AppState { config, tracker });

    (create_router(state.clone()), state, notifier)
}

/// Unique Discord-style user ID for test isolation.
#[allow(dead_code)]
pub fn unique_user_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string()
}
