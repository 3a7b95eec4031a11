#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

use serde_json::json;
use users_api_rust::database::{MemoryUserStore, UserRecord};
use users_api_rust::migrations::{BackfillOptions, ColorBackfill};

static TRACING: Once = Once::new();

/// Route engine logs to the test output when RUST_LOG is set
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn user(id: &str, username: &str) -> UserRecord {
    UserRecord::new(id)
        .with("username", username)
        .with("github_id", format!("{username}-gh"))
        .with("incompleteUserDetails", false)
        .with("roles", json!({ "archived": false, "super_user": false }))
}

pub fn colored_user(id: &str, username: &str, color_id: u32) -> UserRecord {
    let mut record = user(id, username);
    record.set_color_id(color_id);
    record
}

/// `n` users without colours, ids `user-000`, `user-001`, ...
pub fn uncolored_users(n: usize) -> Vec<UserRecord> {
    (0..n)
        .map(|i| user(&format!("user-{i:03}"), &format!("member{i}")))
        .collect()
}

pub fn options() -> BackfillOptions {
    BackfillOptions {
        seed: Some(2023),
        ..BackfillOptions::default()
    }
}

pub fn backfill(store: &MemoryUserStore, options: BackfillOptions) -> ColorBackfill {
    init_tracing();
    ColorBackfill::new(Arc::new(store.clone()), options)
}

/// Poll until `store` has committed `writes` writes or `timeout` passes
pub async fn wait_for_writes(store: &MemoryUserStore, writes: usize, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if store.committed_writes().await >= writes {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
