use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::database::store::{StoreError, UserStore, WriteBatch, MAX_TRANSACTION_WRITES};
use crate::database::user::UserRecord;

#[derive(Debug, Clone)]
struct CommittedBatch {
    sequence: usize,
    ids: Vec<String>,
}

#[derive(Default)]
struct Shared {
    documents: RwLock<BTreeMap<String, UserRecord>>,
    commits: Mutex<Vec<CommittedBatch>>,
    failing_batches: Mutex<HashSet<usize>>,
    opened: AtomicUsize,
    fail_fetch: AtomicBool,
}

/// In-process user store ordered by document id.
///
/// Enforces the same per-transaction ceiling as the managed store, keeps a log
/// of committed batches, and can be told to fail reads or specific batch
/// commits. Used for local development and throughout the test suite.
#[derive(Clone)]
pub struct MemoryUserStore {
    shared: Arc<Shared>,
    max_writes: usize,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            max_writes: MAX_TRANSACTION_WRITES,
        }
    }

    /// Seed the store with users. Later duplicates replace earlier ones.
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let documents = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self {
            shared: Arc::new(Shared {
                documents: RwLock::new(documents),
                ..Shared::default()
            }),
            max_writes: MAX_TRANSACTION_WRITES,
        }
    }

    pub fn with_max_writes(mut self, max_writes: usize) -> Self {
        self.max_writes = max_writes;
        self
    }

    pub async fn insert(&self, user: UserRecord) {
        self.shared.documents.write().await.insert(user.id.clone(), user);
    }

    pub async fn get(&self, id: &str) -> Option<UserRecord> {
        self.shared.documents.read().await.get(id).cloned()
    }

    pub async fn users(&self) -> Vec<UserRecord> {
        self.shared.documents.read().await.values().cloned().collect()
    }

    /// Make every subsequent `retrieve_all` fail as if the store were down
    pub fn fail_fetch(&self, fail: bool) {
        self.shared.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Reject the commit of the batch opened in position `sequence` (0-based)
    pub async fn fail_commit_of(&self, sequence: usize) {
        self.shared.failing_batches.lock().await.insert(sequence);
    }

    pub fn batches_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Sizes of successfully committed batches, in the order they were opened
    pub async fn committed_batch_sizes(&self) -> Vec<usize> {
        let mut commits = self.shared.commits.lock().await.clone();
        commits.sort_by_key(|c| c.sequence);
        commits.into_iter().map(|c| c.ids.len()).collect()
    }

    pub async fn committed_writes(&self) -> usize {
        self.shared.commits.lock().await.iter().map(|c| c.ids.len()).sum()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn retrieve_all(&self, limit: usize) -> Result<Vec<UserRecord>, StoreError> {
        if self.shared.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }

        let documents = self.shared.documents.read().await;
        Ok(documents.values().take(limit).cloned().collect())
    }

    fn open_batch(&self) -> Box<dyn WriteBatch> {
        let sequence = self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Box::new(MemoryWriteBatch {
            shared: Arc::clone(&self.shared),
            sequence,
            max_writes: self.max_writes,
            writes: Vec::new(),
        })
    }

    fn max_writes_per_batch(&self) -> usize {
        self.max_writes
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.shared.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

struct MemoryWriteBatch {
    shared: Arc<Shared>,
    sequence: usize,
    max_writes: usize,
    writes: Vec<(String, UserRecord)>,
}

#[async_trait]
impl WriteBatch for MemoryWriteBatch {
    fn queue_write(&mut self, id: &str, mut record: UserRecord) {
        record.id = id.to_string();
        self.writes.push((id.to_string(), record));
    }

    fn len(&self) -> usize {
        self.writes.len()
    }

    async fn commit(self: Box<Self>) -> Result<usize, StoreError> {
        if self.shared.failing_batches.lock().await.contains(&self.sequence) {
            return Err(StoreError::Rejected(format!("batch {} rejected", self.sequence)));
        }
        if self.writes.len() > self.max_writes {
            return Err(StoreError::BatchTooLarge {
                ops: self.writes.len(),
                max: self.max_writes,
            });
        }

        // Documents and the commit log change together or not at all
        let mut documents = self.shared.documents.write().await;
        let mut commits = self.shared.commits.lock().await;

        let mut ids = Vec::with_capacity(self.writes.len());
        for (id, record) in self.writes {
            documents.insert(id.clone(), record);
            ids.push(id);
        }

        let written = ids.len();
        commits.push(CommittedBatch {
            sequence: self.sequence,
            ids,
        });
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{colored_user, user};

    #[tokio::test]
    async fn retrieve_all_truncates_silently() {
        let store = MemoryUserStore::with_users((0..5).map(|i| user(&format!("u{i}"), "x")));

        assert_eq!(store.retrieve_all(3).await.unwrap().len(), 3);
        assert_eq!(store.retrieve_all(50).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn oversized_batch_fails_whole_commit() {
        let store = MemoryUserStore::new().with_max_writes(2);
        let mut batch = store.open_batch();
        for i in 0..3 {
            let id = format!("u{i}");
            batch.queue_write(&id, colored_user(&id, "x", 1));
        }

        let err = batch.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::BatchTooLarge { ops: 3, max: 2 }));
        assert!(store.users().await.is_empty());
        assert_eq!(store.committed_writes().await, 0);
    }

    #[tokio::test]
    async fn injected_commit_failure_targets_one_batch() {
        let store = MemoryUserStore::new();
        store.fail_commit_of(1).await;

        let mut first = store.open_batch();
        first.queue_write("a", user("a", "alpha"));
        let mut second = store.open_batch();
        second.queue_write("b", user("b", "beta"));

        assert_eq!(first.commit().await.unwrap(), 1);
        assert!(matches!(second.commit().await, Err(StoreError::Rejected(_))));
        assert!(store.get("a").await.is_some());
        assert!(store.get("b").await.is_none());
        assert_eq!(store.batches_opened(), 2);
    }
}
