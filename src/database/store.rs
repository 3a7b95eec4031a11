use async_trait::async_trait;
use thiserror::Error;

use crate::database::user::UserRecord;

/// Hard per-transaction write ceiling of the backing document store
pub const MAX_TRANSACTION_WRITES: usize = 500;

/// Default cap on how many users a single bulk read returns
pub const MAX_USERS_SIZE: usize = 10_000;

/// Errors raised by a user store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Batch of {ops} writes exceeds the transaction ceiling of {max}")]
    BatchTooLarge { ops: usize, max: usize },

    #[error("Malformed user record: {0}")]
    MalformedRecord(String),

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Bulk access to the `users` collection.
///
/// Implementations are injected into the migration engine, so a run never
/// reaches for a global collection handle.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Read up to `limit` users in store order. Fewer users than `limit` is
    /// not an error; more are silently truncated.
    async fn retrieve_all(&self, limit: usize) -> Result<Vec<UserRecord>, StoreError>;

    /// Open an empty write batch
    fn open_batch(&self) -> Box<dyn WriteBatch>;

    /// Most writes a single batch may carry before its commit fails outright
    fn max_writes_per_batch(&self) -> usize {
        MAX_TRANSACTION_WRITES
    }

    /// Cheap connectivity probe used by `/health`
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A group of full-document writes committed as one atomic transaction
#[async_trait]
pub trait WriteBatch: Send {
    /// Queue a full replacement of document `id`
    fn queue_write(&mut self, id: &str, record: UserRecord);

    /// Number of queued writes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every queued write or none of them. Returns the number written.
    async fn commit(self: Box<Self>) -> Result<usize, StoreError>;
}
