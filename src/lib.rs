// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Enigma-Tracker: progress tracking for a step-by-step Discord event
//!
//! This crate provides the backend API that issues data tokens to Discord
//! users, advances them through the event steps and announces their
//! progress in a Discord channel.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::ProgressTracker;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tracker: ProgressTracker,
}
