use std::sync::Arc;

use futures::future::FutureExt;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, warn};

use crate::config::CommitPolicy;
use crate::database::{UserStore, WriteBatch};
use crate::migrations::batcher::PendingWrite;
use crate::migrations::error::{BackfillError, BatchFailure};

/// What happened to a run's batches
#[derive(Debug, Default)]
pub struct CommitReport {
    pub total_batches: usize,
    /// Batches confirmed committed (always 0 for detached commits)
    pub committed_batches: usize,
    pub failures: Vec<BatchFailure>,
}

/// Commit every batch as its own transaction.
///
/// Batches are opened and filled in order, then committed at most
/// `max_concurrent` at a time. A failed batch never rolls back the others.
pub async fn commit_batches(
    store: Arc<dyn UserStore>,
    batches: Vec<Vec<PendingWrite>>,
    policy: CommitPolicy,
    max_concurrent: usize,
) -> Result<CommitReport, BackfillError> {
    let total_batches = batches.len();
    let handles: Vec<Box<dyn WriteBatch>> = batches
        .into_iter()
        .map(|writes| {
            let mut batch = store.open_batch();
            for write in writes {
                batch.queue_write(&write.id, write.record);
            }
            batch
        })
        .collect();

    if policy == CommitPolicy::Detached {
        for (index, batch) in handles.into_iter().enumerate() {
            tokio::spawn(async move {
                let writes = batch.len();
                match batch.commit().await {
                    Ok(written) => debug!("Detached batch {} committed {} writes", index, written),
                    Err(e) => error!("Detached batch {} ({} writes) failed: {}", index, writes, e),
                }
            });
        }
        return Ok(CommitReport {
            total_batches,
            ..CommitReport::default()
        });
    }

    let pending: Vec<_> = handles
        .into_iter()
        .enumerate()
        .map(|(index, batch)| commit_one(index, batch).boxed())
        .collect();
    let mut commits = stream::iter(pending).buffer_unordered(max_concurrent.max(1));

    let mut report = CommitReport {
        total_batches,
        ..CommitReport::default()
    };

    while let Some(outcome) = commits.next().await {
        match outcome {
            Ok((index, written)) => {
                debug!("Batch {} committed {} writes", index, written);
                report.committed_batches += 1;
            }
            Err(failure) => {
                warn!(
                    "Batch {} ({} writes) failed to commit: {}",
                    failure.batch, failure.writes, failure.source
                );
                if policy == CommitPolicy::FailFast {
                    return Err(BackfillError::Commit {
                        batch: failure.batch,
                        source: failure.source,
                    });
                }
                report.failures.push(failure);
            }
        }
    }

    report.failures.sort_by_key(|f| f.batch);
    Ok(report)
}

async fn commit_one(index: usize, batch: Box<dyn WriteBatch>) -> Result<(usize, usize), BatchFailure> {
    let writes = batch.len();
    batch
        .commit()
        .await
        .map(|written| (index, written))
        .map_err(|source| BatchFailure {
            batch: index,
            writes,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryUserStore;
    use crate::testing::user;

    fn batches(sizes: &[usize]) -> Vec<Vec<PendingWrite>> {
        let mut next = 0;
        sizes
            .iter()
            .map(|&n| {
                (0..n)
                    .map(|_| {
                        next += 1;
                        PendingWrite::new(user(&format!("u{next:03}"), "x"))
                    })
                    .collect()
            })
            .collect()
    }

    #[tokio::test]
    async fn await_all_collects_every_failure() {
        let store = MemoryUserStore::new();
        store.fail_commit_of(0).await;
        store.fail_commit_of(2).await;

        let report = commit_batches(
            Arc::new(store.clone()),
            batches(&[2, 2, 1]),
            CommitPolicy::AwaitAll,
            2,
        )
        .await
        .unwrap();

        assert_eq!(report.total_batches, 3);
        assert_eq!(report.committed_batches, 1);
        let failed: Vec<usize> = report.failures.iter().map(|f| f.batch).collect();
        assert_eq!(failed, vec![0, 2]);
        assert_eq!(store.committed_batch_sizes().await, vec![2]);
    }

    #[tokio::test]
    async fn fail_fast_surfaces_the_failed_batch() {
        let store = MemoryUserStore::new();
        store.fail_commit_of(0).await;

        let err = commit_batches(
            Arc::new(store.clone()),
            batches(&[1, 1]),
            CommitPolicy::FailFast,
            1,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BackfillError::Commit { batch: 0, .. }));
    }

    #[tokio::test]
    async fn nothing_to_commit_opens_nothing() {
        let store = MemoryUserStore::new();
        let report = commit_batches(Arc::new(store.clone()), Vec::new(), CommitPolicy::AwaitAll, 4)
            .await
            .unwrap();

        assert_eq!(report.total_batches, 0);
        assert_eq!(store.batches_opened(), 0);
    }
}
