// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discord REST client for event announcements.
//!
//! Handles:
//! - Resolving the logs channel inside the configured guild
//! - Posting announcement messages
//! - Granting the completion role
//!
//! A channel that is missing or belongs to another guild silently drops the
//! message, mirroring a cache miss on a gateway client.

use crate::config::DiscordConfig;
use crate::error::AppError;
use crate::services::notifier::{Notification, Notifier};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

/// Channel fields we care about.
#[derive(Debug, Deserialize)]
pub struct DiscordChannel {
    pub id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// Discord bot client.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    guild_id: String,
    logs_channel_id: String,
    completion_role_id: Option<String>,
}

impl DiscordNotifier {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            guild_id: config.guild_id.clone(),
            logs_channel_id: config.logs_channel_id.clone(),
            completion_role_id: config.completion_role_id.clone(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Look up the logs channel; `None` if it does not exist in our guild.
    pub async fn resolve_logs_channel(&self) -> Result<Option<DiscordChannel>, AppError> {
        let url = format!("{}/channels/{}", self.base_url, self.logs_channel_id);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::Discord(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let channel: DiscordChannel = check_response_json(response).await?;
        if channel.guild_id.as_deref() != Some(self.guild_id.as_str()) {
            return Ok(None);
        }
        Ok(Some(channel))
    }

    /// Post a plain-text message to a channel.
    pub async fn post_message(&self, channel_id: &str, content: &str) -> Result<(), AppError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| AppError::Discord(e.to_string()))?;

        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        let Some(channel) = self.resolve_logs_channel().await? else {
            tracing::debug!(
                guild_id = %self.guild_id,
                channel_id = %self.logs_channel_id,
                "Logs channel not found in guild, dropping notification"
            );
            return Ok(());
        };

        self.post_message(&channel.id, &notification.message())
            .await
    }

    async fn grant_completion_role(&self, user_id: &str) -> Result<(), AppError> {
        let Some(role_id) = &self.completion_role_id else {
            return Ok(());
        };

        let url = format!(
            "{}/guilds/{}/members/{}/roles/{}",
            self.base_url, self.guild_id, user_id, role_id
        );

        let response = self
            .http
            .put(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::Discord(e.to_string()))?;

        ensure_success(response).await?;
        tracing::info!(user_id, role_id = %role_id, "Completion role granted");
        Ok(())
    }
}

/// Pass successful responses through, turn the rest into errors.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("Discord rate limit hit (429)");
    }

    Err(AppError::Discord(format!("HTTP {}: {}", status, body)))
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    ensure_success(response)
        .await?
        .json()
        .await
        .map_err(|e| AppError::Discord(format!("Invalid JSON: {}", e)))
}
