// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod discord;
pub mod notifier;
pub mod progress;
pub mod token;

pub use discord::DiscordNotifier;
pub use notifier::{Notification, Notifier, Participant, RecordingNotifier};
pub use progress::ProgressTracker;
