// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Step progression for event participants.
//!
//! A participant logs in once, receives a data token, and advances one step
//! per call until the configured step count; the call made while standing on
//! the last step completes the event. Each change is announced through the
//! [`Notifier`], and announcements never undo a state change.

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::models::{GlobalStats, ProgressRecord, Transition};
use crate::services::notifier::{Notification, Notifier, Participant};
use crate::services::token;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;

/// Tracks participants through the event steps.
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    step_count: u32,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>, step_count: u32) -> Self {
        Self {
            store,
            notifier,
            step_count,
        }
    }

    /// Return the participant's token, creating their record on first login.
    ///
    /// Two concurrent first logins for one user can both miss the lookup and
    /// create two records.
    pub async fn login(&self, user_id: &str, username: &str, avatar_url: &str) -> Result<String> {
        if let Some(existing) = self.store.find_by_user_id(user_id).await? {
            tracing::info!(
                user_id,
                username = %existing.record.username,
                token = %token::redact(&existing.data_token),
                "Returning participant"
            );
            return Ok(existing.data_token);
        }

        self.create_record(user_id, username, avatar_url).await
    }

    /// Create a record at step 1 and announce the new participant.
    ///
    /// The caller must have checked that `user_id` has no record yet.
    pub async fn create_record(
        &self,
        user_id: &str,
        username: &str,
        avatar_url: &str,
    ) -> Result<String> {
        let data_token = token::generate_token();
        let record = ProgressRecord::new(
            user_id,
            username,
            avatar_url,
            token::generate_gift_code(),
            now_rfc3339(),
        );

        self.store.put(&data_token, &record).await?;
        tracing::info!(
            user_id,
            username,
            token = %token::redact(&data_token),
            "Created progress record"
        );

        // Count after the write so the newcomer is included
        if let Some(stats) = self.stats_for_notification().await {
            self.notify(Notification::Started {
                participant: Participant::from(&record),
                participants: stats.total,
            })
            .await;
        }

        Ok(data_token)
    }

    /// Advance the participant one step, or complete them on the last one.
    ///
    /// Returns `false` when another advancement for the same token won the
    /// race. Fails with `NotFound` for an unknown token.
    pub async fn advance_step(&self, data_token: &str) -> Result<bool> {
        let record = self
            .store
            .get(data_token)
            .await?
            .ok_or_else(|| AppError::NotFound("Unknown data token".to_string()))?;

        match record.transition(self.step_count) {
            Transition::Complete => self.complete(data_token).await,
            Transition::Advance { from, to } => {
                let advanced = self
                    .store
                    .compare_and_set_step(data_token, from, to)
                    .await?;

                if !advanced {
                    tracing::warn!(
                        user_id = %record.user_id,
                        step = from,
                        "Failed to pass step, record changed concurrently"
                    );
                    return Ok(false);
                }

                tracing::info!(
                    user_id = %record.user_id,
                    username = %record.username,
                    step = to,
                    "Participant passed step"
                );

                if let Some(stats) = self.stats_for_notification().await {
                    self.notify(Notification::StepPassed {
                        participant: Participant::from(&record),
                        step: to,
                        at_step: stats.count_at_step(to),
                    })
                    .await;
                }

                Ok(true)
            }
        }
    }

    /// Mark completed, announce the rank and grant the reward role.
    ///
    /// Not idempotent: every call re-announces the completion.
    async fn complete(&self, data_token: &str) -> Result<bool> {
        let Some(record) = self
            .store
            .mark_completed(data_token, &now_rfc3339())
            .await?
        else {
            return Err(AppError::NotFound("Unknown data token".to_string()));
        };

        tracing::info!(
            user_id = %record.user_id,
            username = %record.username,
            step = record.step,
            "Participant completed every step"
        );

        if let Some(stats) = self.stats_for_notification().await {
            self.notify(Notification::Completed {
                participant: Participant::from(&record),
                rank: stats.completed,
                gift_code: record.gift_code.clone(),
            })
            .await;
        }

        if let Err(e) = self.notifier.grant_completion_role(&record.user_id).await {
            tracing::error!(
                user_id = %record.user_id,
                error = %e,
                "Failed to grant completion role"
            );
        }

        Ok(true)
    }

    /// True iff a record exists for `data_token`.
    pub async fn is_token_valid(&self, data_token: &str) -> Result<bool> {
        Ok(self.store.get(data_token).await?.is_some())
    }

    pub async fn user_data(&self, data_token: &str) -> Result<Option<ProgressRecord>> {
        self.store.get(data_token).await
    }

    pub async fn find_by_user_id(&self, user_id: &str) -> Result<Option<ProgressRecord>> {
        Ok(self
            .store
            .find_by_user_id(user_id)
            .await?
            .map(|stored| stored.record))
    }

    /// Token of `user_id`'s record. Fails with `NotFound` if there is none.
    pub async fn find_token_by_user_id(&self, user_id: &str) -> Result<String> {
        let stored = self
            .store
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No record for user {}", user_id)))?;

        tracing::info!(
            user_id,
            username = %stored.record.username,
            "Fetched data token for user"
        );
        Ok(stored.data_token)
    }

    /// Full scan of every record.
    pub async fn global_stats(&self) -> Result<GlobalStats> {
        let records = self.store.all().await?;
        Ok(GlobalStats::from_records(
            records.iter().map(|stored| &stored.record),
        ))
    }

    /// Stats for an announcement; a failed scan skips the announcement.
    async fn stats_for_notification(&self) -> Option<GlobalStats> {
        match self.global_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to compute stats, skipping notification");
                None
            }
        }
    }

    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.send(&notification).await {
            tracing::warn!(
                user_id = %notification.participant().user_id,
                error = %e,
                "Failed to send notification"
            );
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
