//! Persistent store interface for scheduler card records.

use async_trait::async_trait;
use review_import_core::{ExistingCard, UpsertRecord};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Backend(String),
}

/// Read/write access to persisted card records.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Cards already stored for `user_id` whose key is in `keys` (any type).
    async fn get_existing(&self, user_id: Uuid, keys: &[String]) -> Result<Vec<ExistingCard>, StoreError>;

    /// Write all records. Atomicity is up to the implementation.
    async fn batch_upsert(&self, user_id: Uuid, records: &[UpsertRecord]) -> Result<(), StoreError>;
}
