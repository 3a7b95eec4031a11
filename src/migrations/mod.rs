// One-off data migrations over the users collection.
//
// A run is a straight pipeline with no persisted state in between:
// fetch → select → assign → batch → commit (one transaction per batch) → report.

pub mod assigner;
pub mod batcher;
pub mod commit;
pub mod error;
pub mod report;
pub mod selector;
pub mod user_colors;

pub use crate::config::CommitPolicy;
pub use assigner::ColorAssigner;
pub use batcher::{PendingWrite, WriteBatcher};
pub use error::{BackfillError, BatchFailure};
pub use report::BackfillSummary;
pub use selector::needs_color;
pub use user_colors::{BackfillOptions, BackfillPlan, ColorBackfill, USER_COLORS};
