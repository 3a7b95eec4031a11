use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{CommitPolicy, MigrationConfig};
use crate::database::{UserStore, MAX_TRANSACTION_WRITES, MAX_USERS_SIZE};
use crate::migrations::assigner::ColorAssigner;
use crate::migrations::batcher::{PendingWrite, WriteBatcher};
use crate::migrations::commit::commit_batches;
use crate::migrations::error::BackfillError;
use crate::migrations::report::BackfillSummary;
use crate::migrations::selector::needs_color;

pub const USER_COLORS: u32 = 10;

#[derive(Debug, Clone)]
pub struct BackfillOptions {
    /// Writes per batch when the caller does not ask for a size
    pub batch_size: usize,
    /// Upper bound on users read in one run
    pub max_users: usize,
    pub palette_size: u32,
    pub commit_policy: CommitPolicy,
    pub max_concurrent_commits: usize,
    /// Fixed RNG seed; each run draws from a fresh entropy seed when unset
    pub seed: Option<u64>,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            batch_size: MAX_TRANSACTION_WRITES,
            max_users: MAX_USERS_SIZE,
            palette_size: USER_COLORS,
            commit_policy: CommitPolicy::AwaitAll,
            max_concurrent_commits: 4,
            seed: None,
        }
    }
}

impl From<&MigrationConfig> for BackfillOptions {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_users: config.max_users,
            palette_size: config.palette_size,
            commit_policy: config.commit_policy,
            max_concurrent_commits: config.max_concurrent_commits,
            seed: config.seed,
        }
    }
}

/// Users selected for a colour and already split into batches, not yet written
#[derive(Debug)]
pub struct BackfillPlan {
    pub summary: BackfillSummary,
    pub batches: Vec<Vec<PendingWrite>>,
}

impl BackfillPlan {
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.iter().map(Vec::len).collect()
    }
}

/// Gives every user without a `colors` attribute a random default colour.
///
/// A run reads the whole collection once, colours the users that have none,
/// and writes them back in independent batches. Users that already carry a
/// colour are never written, so a rerun after a partial failure only picks up
/// what is still missing.
pub struct ColorBackfill {
    store: Arc<dyn UserStore>,
    options: BackfillOptions,
}

impl ColorBackfill {
    pub fn new(store: Arc<dyn UserStore>, options: BackfillOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    fn resolve_batch_size(&self, requested: Option<usize>) -> Result<usize, BackfillError> {
        let size = requested.unwrap_or(self.options.batch_size);
        let max = self.store.max_writes_per_batch();
        if size == 0 || size > max {
            return Err(BackfillError::InvalidBatchSize { size, max });
        }
        Ok(size)
    }

    fn assigner(&self) -> Result<ColorAssigner, BackfillError> {
        match self.options.seed {
            Some(seed) => ColorAssigner::seeded(self.options.palette_size, seed),
            None => ColorAssigner::from_entropy(self.options.palette_size),
        }
    }

    /// Fetch, select, assign and batch without writing anything
    pub async fn plan(&self, batch_size: Option<usize>) -> Result<BackfillPlan, BackfillError> {
        let batch_size = self.resolve_batch_size(batch_size)?;
        let mut assigner = self.assigner()?;

        let users = self
            .store
            .retrieve_all(self.options.max_users)
            .await
            .map_err(BackfillError::Fetch)?;
        let fetched = users.len();

        let mut batcher = WriteBatcher::new(batch_size);
        for mut user in users {
            if !needs_color(&user) {
                continue;
            }
            let color_id = assigner.assign(&mut user);
            debug!(
                user = user.username().unwrap_or(user.id.as_str()),
                color_id, "Assigned default colour"
            );
            batcher.push(PendingWrite::new(user));
        }

        let summary = BackfillSummary::new(fetched, batcher.total_writes());
        Ok(BackfillPlan {
            summary,
            batches: batcher.finish(),
        })
    }

    /// Run the backfill and report how many users were touched.
    ///
    /// `batch_size` overrides the configured size for this run only.
    #[instrument(name = "color_backfill", skip(self), fields(run_id = %Uuid::new_v4()))]
    pub async fn run(&self, batch_size: Option<usize>) -> Result<BackfillSummary, BackfillError> {
        let result = self.run_inner(batch_size).await;
        if let Err(e) = &result {
            debug!("Error adding default colors to users: {}", e);
        }
        result
    }

    async fn run_inner(&self, batch_size: Option<usize>) -> Result<BackfillSummary, BackfillError> {
        let BackfillPlan { summary, batches } = self.plan(batch_size).await?;

        info!(
            fetched = summary.total_users_fetched,
            updated = summary.total_users_updated,
            batches = batches.len(),
            policy = ?self.options.commit_policy,
            "Committing colour backfill"
        );

        let report = commit_batches(
            Arc::clone(&self.store),
            batches,
            self.options.commit_policy,
            self.options.max_concurrent_commits,
        )
        .await?;

        if !report.failures.is_empty() {
            return Err(BackfillError::PartialCommit {
                failures: report.failures,
                total_batches: report.total_batches,
                summary,
            });
        }

        info!(
            committed = report.committed_batches,
            unaffected = summary.total_users_unaffected,
            "Colour backfill finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryUserStore;
    use crate::testing::{colored_user, seeded_options, user};

    fn engine(store: &MemoryUserStore, options: BackfillOptions) -> ColorBackfill {
        ColorBackfill::new(Arc::new(store.clone()), options)
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn run_future_can_be_served_by_axum() {
        let store = MemoryUserStore::new();
        let backfill = engine(&store, seeded_options());
        assert_send(backfill.run(None));
        assert_send(backfill.plan(Some(1)));
    }

    #[tokio::test]
    async fn null_colors_are_backfilled() {
        let store = MemoryUserStore::with_users([
            user("a", "ankush").with("colors", serde_json::Value::Null),
            colored_user("b", "nikhil", 2),
        ]);

        let summary = engine(&store, seeded_options()).run(None).await.unwrap();

        assert_eq!(summary, BackfillSummary::new(2, 1));
        assert!(store.get("a").await.unwrap().color_id().is_some());
    }

    #[tokio::test]
    async fn colours_only_users_without_one() {
        let store = MemoryUserStore::with_users([
            user("a", "ankush"),
            colored_user("b", "nikhil", 4),
            user("c", "sumit"),
        ]);

        let summary = engine(&store, seeded_options()).run(None).await.unwrap();

        assert_eq!(summary, BackfillSummary::new(3, 2));
        for id in ["a", "c"] {
            let color = store.get(id).await.unwrap().color_id().unwrap();
            assert!(color < USER_COLORS);
        }
        assert_eq!(store.get("b").await.unwrap().color_id(), Some(4));
    }

    #[tokio::test]
    async fn plan_writes_nothing() {
        let store = MemoryUserStore::with_users((0..5).map(|i| user(&format!("u{i}"), "x")));

        let plan = engine(&store, seeded_options()).plan(Some(2)).await.unwrap();

        assert_eq!(plan.batch_sizes(), vec![2, 2, 1]);
        assert_eq!(plan.summary.total_users_updated, 5);
        assert_eq!(store.batches_opened(), 0);
        assert!(store.users().await.iter().all(|u| !u.has_colors()));
    }

    #[tokio::test]
    async fn rejects_batch_sizes_outside_the_store_ceiling() {
        let store = MemoryUserStore::with_users([user("a", "ankush")]).with_max_writes(10);
        let backfill = engine(&store, seeded_options());

        assert!(matches!(
            backfill.run(Some(0)).await,
            Err(BackfillError::InvalidBatchSize { size: 0, max: 10 })
        ));
        assert!(matches!(
            backfill.run(Some(11)).await,
            Err(BackfillError::InvalidBatchSize { size: 11, max: 10 })
        ));
        assert!(!store.get("a").await.unwrap().has_colors());
    }

    #[tokio::test]
    async fn empty_palette_fails_before_reading() {
        let store = MemoryUserStore::with_users([user("a", "ankush")]);
        store.fail_fetch(true);
        let options = BackfillOptions {
            palette_size: 0,
            ..seeded_options()
        };

        let err = engine(&store, options).run(None).await.unwrap_err();
        assert!(matches!(err, BackfillError::EmptyPalette));
    }

    #[tokio::test]
    async fn seeded_runs_assign_the_same_colours() {
        let users: Vec<_> = (0..20).map(|i| user(&format!("u{i:02}"), "x")).collect();
        let first = MemoryUserStore::with_users(users.clone());
        let second = MemoryUserStore::with_users(users);

        engine(&first, seeded_options()).run(None).await.unwrap();
        engine(&second, seeded_options()).run(None).await.unwrap();

        assert_eq!(first.users().await, second.users().await);
    }

    #[tokio::test]
    async fn max_users_caps_the_read() {
        let store = MemoryUserStore::with_users((0..8).map(|i| user(&format!("u{i}"), "x")));
        let options = BackfillOptions {
            max_users: 5,
            ..seeded_options()
        };

        let summary = engine(&store, options).run(None).await.unwrap();
        assert_eq!(summary, BackfillSummary::new(5, 5));
        assert!(!store.get("u7").await.unwrap().has_colors());
    }
}
