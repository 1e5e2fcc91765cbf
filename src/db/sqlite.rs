// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Embedded SQLite record store.
//!
//! One key-value table: `event_stats(id TEXT PRIMARY KEY, json TEXT)`, where
//! `id` is the data token and `json` the serialized record. Calls run on the
//! blocking pool behind a single connection mutex.

use crate::db::{collections, RecordStore, StoredRecord};
use crate::error::AppError;
use crate::models::ProgressRecord;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite-backed record store.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `path` (`:memory:` for a private in-memory db).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Database(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            AppError::Database(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Self::init_schema(&conn)?;

        tracing::info!(path = %path.display(), "Opened SQLite record store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Private in-memory store (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), AppError> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    json TEXT NOT NULL
                )",
                collections::EVENT_STATS
            ),
            [],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Connection) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| AppError::Database("SQLite connection mutex poisoned".to_string()))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("SQLite task failed: {}", e)))?
    }
}

fn sql_err(e: rusqlite::Error) -> AppError {
    AppError::Database(e.to_string())
}

fn decode(json: &str) -> Result<ProgressRecord, AppError> {
    serde_json::from_str(json).map_err(|e| AppError::Database(format!("Corrupt record: {}", e)))
}

fn encode(record: &ProgressRecord) -> Result<String, AppError> {
    serde_json::to_string(record).map_err(|e| AppError::Internal(e.into()))
}

fn select_json(conn: &Connection, data_token: &str) -> Result<Option<String>, AppError> {
    conn.query_row(
        "SELECT json FROM event_stats WHERE id = ?1",
        params![data_token],
        |row| row.get(0),
    )
    .optional()
    .map_err(sql_err)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, data_token: &str) -> Result<Option<ProgressRecord>, AppError> {
        let data_token = data_token.to_string();
        self.with_conn(move |conn| {
            select_json(conn, &data_token)?
                .as_deref()
                .map(decode)
                .transpose()
        })
        .await
    }

    async fn put(&self, data_token: &str, record: &ProgressRecord) -> Result<(), AppError> {
        let data_token = data_token.to_string();
        let json = encode(record)?;
        self.with_conn(move |conn| {
            // Upsert in place so rowid (scan order) survives overwrites.
            conn.execute(
                "INSERT INTO event_stats (id, json) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET json = excluded.json",
                params![data_token, json],
            )
            .map_err(sql_err)?;
            Ok(())
        })
        .await
    }

    async fn all(&self) -> Result<Vec<StoredRecord>, AppError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, json FROM event_stats ORDER BY rowid")
                .map_err(sql_err)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(sql_err)?;

            let mut records = Vec::new();
            for row in rows {
                let (data_token, json) = row.map_err(sql_err)?;
                records.push(StoredRecord {
                    data_token,
                    record: decode(&json)?,
                });
            }
            Ok(records)
        })
        .await
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<StoredRecord>, AppError> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT id, json FROM event_stats
                     WHERE json_extract(json, '$.userId') = ?1
                     ORDER BY rowid LIMIT 1",
                    params![user_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(sql_err)?;

            row.map(|(data_token, json)| {
                Ok::<_, AppError>(StoredRecord {
                    data_token,
                    record: decode(&json)?,
                })
            })
            .transpose()
        })
        .await
    }

    async fn compare_and_set_step(
        &self,
        data_token: &str,
        expected: u32,
        next: u32,
    ) -> Result<bool, AppError> {
        let data_token = data_token.to_string();
        self.with_conn(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(sql_err)?;

            let Some(json) = select_json(&tx, &data_token)? else {
                return Ok(false);
            };
            let mut record = decode(&json)?;
            if record.step != expected {
                return Ok(false);
            }

            record.step = next;
            tx.execute(
                "UPDATE event_stats SET json = ?2 WHERE id = ?1",
                params![data_token, encode(&record)?],
            )
            .map_err(sql_err)?;
            tx.commit().map_err(sql_err)?;
            Ok(true)
        })
        .await
    }

    async fn mark_completed(
        &self,
        data_token: &str,
        now: &str,
    ) -> Result<Option<ProgressRecord>, AppError> {
        let data_token = data_token.to_string();
        let now = now.to_string();
        self.with_conn(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(sql_err)?;

            let Some(json) = select_json(&tx, &data_token)? else {
                return Ok(None);
            };
            let mut record = decode(&json)?;
            record.mark_completed(&now);

            tx.execute(
                "UPDATE event_stats SET json = ?2 WHERE id = ?1",
                params![data_token, encode(&record)?],
            )
            .map_err(sql_err)?;
            tx.commit().map_err(sql_err)?;
            Ok(Some(record))
        })
        .await
    }
}
