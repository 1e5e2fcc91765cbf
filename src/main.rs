// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Enigma-Tracker API Server
//!
//! Issues data tokens to Discord users, tracks their progress through the
//! event steps and announces it in the event's Discord channel.

use enigma_tracker::{
    config::Config,
    db,
    services::{DiscordNotifier, Notifier, ProgressTracker, RecordingNotifier},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        version = env!("CARGO_PKG_VERSION"),
        step_count = config.step_count,
        "Starting Enigma-Tracker API"
    );

    // Open the record store
    let store = db::open_store(&config).await?;
    tracing::info!(backend = ?config.store_backend, "Record store ready");

    // Discord announcements, or dry run when no bot is configured
    let notifier: Arc<dyn Notifier> = match &config.discord {
        Some(discord) => {
            tracing::info!(
                guild_id = %discord.guild_id,
                channel_id = %discord.logs_channel_id,
                "Discord notifications enabled"
            );
            Arc::new(DiscordNotifier::new(discord))
        }
        None => {
            tracing::warn!("BOT_TOKEN not set, notifications will only be logged");
            Arc::new(RecordingNotifier::dry_run())
        }
    };

    let tracker = ProgressTracker::new(store, notifier, config.step_count);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        tracker,
    });

    // Build router
    let app = enigma_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("enigma_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
