// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Discord credentials are optional: without `BOT_TOKEN` the server runs in
//! dry-run mode and notifications are only logged.

use std::env;

/// Which backend holds the progress records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Embedded SQLite database file.
    Sqlite,
    /// Google Cloud Firestore.
    Firestore,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "firestore" => Ok(StoreBackend::Firestore),
            other => Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        }
    }
}

/// Discord bot settings used for event announcements.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token (sent as `Authorization: Bot <token>`)
    pub bot_token: String,
    /// Guild (server) the event runs in
    pub guild_id: String,
    /// Channel receiving progress announcements
    pub logs_channel_id: String,
    /// Role granted to participants who finish every step
    pub completion_role_id: Option<String>,
    /// REST API base URL
    pub api_url: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Record store backend
    pub store_backend: StoreBackend,
    /// SQLite database file (sqlite backend)
    pub database_path: String,
    /// GCP project ID (firestore backend)
    pub gcp_project_id: String,
    /// Number of steps a participant must pass to complete the event
    pub step_count: u32,
    /// CDN host serving user avatars
    pub avatar_cdn_url: String,
    /// Discord settings; `None` means dry-run notifications
    pub discord: Option<DiscordConfig>,
}

const DEFAULT_PORT: u16 = 4884;
const DEFAULT_STEP_COUNT: u32 = 10;
const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";
const DEFAULT_AVATAR_CDN_URL: &str = "https://cdn.discordapp.com";

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let step_count = match get("STEP_COUNT") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::Invalid("STEP_COUNT", raw)),
            },
            None => DEFAULT_STEP_COUNT,
        };

        let store_backend = get("STORE_BACKEND")
            .map(|v| v.parse::<StoreBackend>())
            .transpose()?
            .unwrap_or(StoreBackend::Sqlite);

        let discord = match get("BOT_TOKEN") {
            Some(bot_token) => Some(DiscordConfig {
                bot_token,
                guild_id: get("GUILD_ID").ok_or(ConfigError::Missing("GUILD_ID"))?,
                logs_channel_id: get("LOGS_CHANNEL_ID")
                    .ok_or(ConfigError::Missing("LOGS_CHANNEL_ID"))?,
                completion_role_id: get("COMPLETION_ROLE_ID"),
                api_url: get("DISCORD_API_URL")
                    .unwrap_or_else(|| DEFAULT_DISCORD_API_URL.to_string()),
            }),
            None => None,
        };

        Ok(Self {
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            frontend_url: get("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            store_backend,
            database_path: get("DATABASE_PATH")
                .unwrap_or_else(|| "data/event_stats.db".to_string()),
            gcp_project_id: get("GCP_PROJECT_ID").unwrap_or_else(|| "local-dev".to_string()),
            step_count,
            avatar_cdn_url: get("AVATAR_CDN_URL")
                .unwrap_or_else(|| DEFAULT_AVATAR_CDN_URL.to_string()),
            discord,
        })
    }

    /// Config for tests: in-memory SQLite, no Discord.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            store_backend: StoreBackend::Sqlite,
            database_path: ":memory:".to_string(),
            gcp_project_id: "test-project".to_string(),
            step_count: DEFAULT_STEP_COUNT,
            avatar_cdn_url: DEFAULT_AVATAR_CDN_URL.to_string(),
            discord: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
