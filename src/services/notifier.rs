// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Progress announcements.
//!
//! The tracker builds a [`Notification`] and hands it to a [`Notifier`].
//! Delivery is best-effort: the tracker logs notifier errors and never rolls
//! back the state change that triggered them.

use crate::error::AppError;
use crate::models::ProgressRecord;
use async_trait::async_trait;
use std::sync::Mutex;

/// Who a notification is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user_id: String,
    pub username: String,
}

impl From<&ProgressRecord> for Participant {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            user_id: record.user_id.clone(),
            username: record.username.clone(),
        }
    }
}

/// Event announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A new participant joined; `participants` includes them.
    Started {
        participant: Participant,
        participants: usize,
    },
    /// A participant reached `step`; `at_step` people are now on it.
    StepPassed {
        participant: Participant,
        step: u32,
        at_step: usize,
    },
    /// A participant finished, `rank`-th overall.
    Completed {
        participant: Participant,
        rank: usize,
        gift_code: String,
    },
}

impl Notification {
    pub fn participant(&self) -> &Participant {
        match self {
            Notification::Started { participant, .. }
            | Notification::StepPassed { participant, .. }
            | Notification::Completed { participant, .. } => participant,
        }
    }

    /// Short name of the variant, safe for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Started { .. } => "started",
            Notification::StepPassed { .. } => "step_passed",
            Notification::Completed { .. } => "completed",
        }
    }

    /// Render as a Discord message.
    pub fn message(&self) -> String {
        match self {
            Notification::Started {
                participant,
                participants,
            } => format!(
                ":door: <@{}> ({}) just started the riddle **({} participants)**",
                participant.user_id, participant.username, participants
            ),
            Notification::StepPassed {
                participant,
                step,
                at_step,
            } => format!(
                ":rocket: <@{}> ({}) reached step ` {} ` **({} on this step)**",
                participant.user_id, participant.username, step, at_step
            ),
            Notification::Completed {
                participant,
                rank,
                gift_code,
            } => format!(
                "🏆 <@{}> ({}) completed every step **(#{})** - gift code: ||{}||",
                participant.user_id, participant.username, rank, gift_code
            ),
        }
    }
}

/// Outbound announcement channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), AppError>;

    /// Grant the completion reward role to `user_id`.
    async fn grant_completion_role(&self, user_id: &str) -> Result<(), AppError>;
}

/// Logs notifications instead of delivering them, optionally keeping them
/// in memory for inspection.
///
/// Used in tests and as the dry-run notifier when Discord is not configured.
#[derive(Default)]
pub struct RecordingNotifier {
    keep_history: bool,
    sent: Mutex<Vec<Notification>>,
    roles_granted: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Log and keep every notification.
    pub fn new() -> Self {
        Self {
            keep_history: true,
            ..Self::default()
        }
    }

    /// Log only; nothing accumulates.
    pub fn dry_run() -> Self {
        Self::default()
    }

    /// Notifications sent so far, oldest first.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Users granted the completion role so far.
    pub fn roles_granted(&self) -> Vec<String> {
        self.roles_granted
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        // The rendered message can carry a gift code; log who and what only
        let participant = notification.participant();
        tracing::info!(
            kind = notification.kind(),
            user_id = %participant.user_id,
            username = %participant.username,
            "Notification (dry run)"
        );
        if self.keep_history {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(notification.clone());
            }
        }
        Ok(())
    }

    async fn grant_completion_role(&self, user_id: &str) -> Result<(), AppError> {
        tracing::info!(user_id, "Completion role grant (dry run)");
        if self.keep_history {
            if let Ok(mut granted) = self.roles_granted.lock() {
                granted.push(user_id.to_string());
            }
        }
        Ok(())
    }
}
