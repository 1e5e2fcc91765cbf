//! Record store: progress records keyed by data token.

pub mod firestore;
pub mod sqlite;

pub use firestore::FirestoreStore;
pub use sqlite::SqliteStore;

use crate::config::{Config, StoreBackend};
use crate::error::AppError;
use crate::models::ProgressRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// Collection / table names as constants.
pub mod collections {
    /// Progress records, keyed by data token
    pub const EVENT_STATS: &str = "event_stats";
}

/// A record together with the data token it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub data_token: String,
    pub record: ProgressRecord,
}

/// Persistence for progress records.
///
/// Scans (`all`) return records in insertion order where the backend can
/// provide it; statistics rely on that order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record stored under `data_token`.
    async fn get(&self, data_token: &str) -> Result<Option<ProgressRecord>, AppError>;

    /// Create or overwrite the record stored under `data_token`.
    async fn put(&self, data_token: &str, record: &ProgressRecord) -> Result<(), AppError>;

    /// Every record with its token.
    async fn all(&self) -> Result<Vec<StoredRecord>, AppError>;

    /// First record belonging to `user_id`.
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<StoredRecord>, AppError> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .find(|stored| stored.record.user_id == user_id))
    }

    /// Set `step` to `next` only if it currently equals `expected`.
    ///
    /// Returns `false` when the record is missing or the step moved.
    async fn compare_and_set_step(
        &self,
        data_token: &str,
        expected: u32,
        next: u32,
    ) -> Result<bool, AppError>;

    /// Mark the record completed and return it, or `None` if missing.
    async fn mark_completed(
        &self,
        data_token: &str,
        now: &str,
    ) -> Result<Option<ProgressRecord>, AppError>;
}

/// Open the store selected by configuration.
pub async fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>, AppError> {
    match config.store_backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.database_path)?;
            Ok(Arc::new(store))
        }
        StoreBackend::Firestore => {
            let store = FirestoreStore::new(&config.gcp_project_id).await?;
            Ok(Arc::new(store))
        }
    }
}
