use serde::{Deserialize, Serialize};

/// Totals returned by a backfill run.
///
/// `total_users_fetched == total_users_updated + total_users_unaffected`
/// holds for every summary built through [`BackfillSummary::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillSummary {
    pub total_users_fetched: usize,
    pub total_users_updated: usize,
    pub total_users_unaffected: usize,
}

impl BackfillSummary {
    pub fn new(fetched: usize, updated: usize) -> Self {
        debug_assert!(updated <= fetched, "cannot update more users than were fetched");
        Self {
            total_users_fetched: fetched,
            total_users_updated: updated,
            total_users_unaffected: fetched.saturating_sub(updated),
        }
    }
}
