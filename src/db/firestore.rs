// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore record store.
//!
//! Same layout as the SQLite store: one collection (`event_stats`) with a
//! document per data token. The token is also written into the document so
//! collection scans can return it.

use crate::db::{collections, RecordStore, StoredRecord};
use crate::error::AppError;
use crate::models::ProgressRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attempts for one read-modify-write before giving up.
const MAX_TRANSACTION_ATTEMPTS: u32 = 5;
/// Backoff unit between attempts (scaled by the attempt number).
const TRANSACTION_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Document shape in the `event_stats` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordDocument {
    data_token: String,
    user_id: String,
    username: String,
    #[serde(rename = "avatarURL")]
    avatar_url: String,
    step: u32,
    completed: bool,
    gift_code: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    completed_at: Option<String>,
}

impl RecordDocument {
    fn new(data_token: &str, record: &ProgressRecord) -> Self {
        Self {
            data_token: data_token.to_string(),
            user_id: record.user_id.clone(),
            username: record.username.clone(),
            avatar_url: record.avatar_url.clone(),
            step: record.step,
            completed: record.completed,
            gift_code: record.gift_code.clone(),
            created_at: record.created_at.clone(),
            completed_at: record.completed_at.clone(),
        }
    }

    fn into_stored(self) -> StoredRecord {
        StoredRecord {
            data_token: self.data_token,
            record: ProgressRecord {
                user_id: self.user_id,
                username: self.username,
                avatar_url: self.avatar_url,
                step: self.step,
                completed: self.completed,
                gift_code: self.gift_code,
                created_at: self.created_at,
                completed_at: self.completed_at,
            },
        }
    }
}

/// Firestore-backed record store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // Emulator: unauthenticated connection to avoid local credential lookups.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    async fn get_document(&self, data_token: &str) -> Result<Option<RecordDocument>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::EVENT_STATS)
            .obj()
            .one(data_token)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read-modify-write one document inside a transaction.
    ///
    /// `update` returns the new document, or `None` to leave it untouched.
    /// A commit that fails (Firestore aborts the loser of two conflicting
    /// transactions) reruns the whole read-modify-write against a fresh read,
    /// up to [`MAX_TRANSACTION_ATTEMPTS`] times.
    async fn update_in_transaction<F>(
        &self,
        data_token: &str,
        update: F,
    ) -> Result<Option<RecordDocument>, AppError>
    where
        F: Fn(RecordDocument) -> Option<RecordDocument>,
    {
        let mut attempt = 1;
        loop {
            match self.try_update_once(data_token, &update).await? {
                CommitOutcome::Done(result) => return Ok(result),
                CommitOutcome::Conflict(e) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::debug!(
                        attempt,
                        error = %e,
                        "Record transaction conflicted, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(TRANSACTION_RETRY_DELAY * attempt).await;
                }
                CommitOutcome::Conflict(e) => {
                    return Err(AppError::Database(format!(
                        "Transaction commit failed after {} attempts: {}",
                        attempt, e
                    )));
                }
            }
        }
    }

    async fn try_update_once<F>(
        &self,
        data_token: &str,
        update: &F,
    ) -> Result<CommitOutcome, AppError>
    where
        F: Fn(RecordDocument) -> Option<RecordDocument>,
    {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Reading through the transaction registers the document for conflict detection
        let reader = Self {
            client: self.client.clone_with_consistency_selector(
                firestore::FirestoreConsistencySelector::Transaction(
                    transaction.transaction_id().clone(),
                ),
            ),
        };
        // A locked document can abort the read as well as the commit
        let current = match reader.get_document(data_token).await {
            Ok(current) => current,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Ok(CommitOutcome::Conflict(e.to_string()));
            }
        };
        let Some(current) = current else {
            let _ = transaction.rollback().await;
            return Ok(CommitOutcome::Done(None));
        };

        let Some(updated) = update(current) else {
            let _ = transaction.rollback().await;
            return Ok(CommitOutcome::Done(None));
        };

        self.client
            .fluent()
            .update()
            .in_col(collections::EVENT_STATS)
            .document_id(data_token)
            .object(&updated)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add record to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(CommitOutcome::Done(Some(updated))),
            Err(e) => Ok(CommitOutcome::Conflict(e.to_string())),
        }
    }
}

/// Result of one transaction attempt.
enum CommitOutcome {
    Done(Option<RecordDocument>),
    /// Transactional read or commit rejected; the error message.
    Conflict(String),
}

#[async_trait]
impl RecordStore for FirestoreStore {
    async fn get(&self, data_token: &str) -> Result<Option<ProgressRecord>, AppError> {
        Ok(self
            .get_document(data_token)
            .await?
            .map(|doc| doc.into_stored().record))
    }

    async fn put(&self, data_token: &str, record: &ProgressRecord) -> Result<(), AppError> {
        let doc = RecordDocument::new(data_token, record);
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::EVENT_STATS)
            .document_id(data_token)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<StoredRecord>, AppError> {
        let docs: Vec<RecordDocument> = self
            .client
            .fluent()
            .select()
            .from(collections::EVENT_STATS)
            // Creation time stands in for insertion order
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(docs.into_iter().map(RecordDocument::into_stored).collect())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<StoredRecord>, AppError> {
        let user_id = user_id.to_string();
        let docs: Vec<RecordDocument> = self
            .client
            .fluent()
            .select()
            .from(collections::EVENT_STATS)
            .filter(move |q| q.for_all([q.field("userId").eq(user_id.clone())]))
            // First match in scan order, as `all` returns it
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Ascending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(docs.into_iter().next().map(RecordDocument::into_stored))
    }

    async fn compare_and_set_step(
        &self,
        data_token: &str,
        expected: u32,
        next: u32,
    ) -> Result<bool, AppError> {
        let updated = self
            .update_in_transaction(data_token, |mut doc| {
                if doc.step != expected {
                    return None;
                }
                doc.step = next;
                Some(doc)
            })
            .await?;

        Ok(updated.is_some())
    }

    async fn mark_completed(
        &self,
        data_token: &str,
        now: &str,
    ) -> Result<Option<ProgressRecord>, AppError> {
        let updated = self
            .update_in_transaction(data_token, |doc| {
                let mut stored = doc.into_stored();
                stored.record.mark_completed(now);
                Some(RecordDocument::new(&stored.data_token, &stored.record))
            })
            .await?;

        Ok(updated.map(|doc| doc.into_stored().record))
    }
}
