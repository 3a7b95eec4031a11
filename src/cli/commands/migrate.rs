use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_success, render_success};
use crate::cli::OutputFormat;
use crate::config::{self, CommitPolicy};
use crate::database::{DatabaseManager, PgUserStore};
use crate::migrations::{BackfillOptions, ColorBackfill};

#[derive(Subcommand)]
pub enum MigrateCommands {
    #[command(about = "Give every user without a colour a random default colour")]
    UserColors {
        #[arg(long, help = "Writes per batch (defaults to MIGRATION_BATCH_SIZE)")]
        batch_size: Option<usize>,
        #[arg(long, help = "Most users read in this run (defaults to MIGRATION_MAX_USERS)")]
        max_users: Option<usize>,
        #[arg(long, help = "Seed the colour picker for a reproducible run")]
        seed: Option<u64>,
        #[arg(long, help = "Commit policy: await-all or fail-fast")]
        policy: Option<CommitPolicy>,
        #[arg(long, help = "Show what would change without writing anything")]
        dry_run: bool,
    },
}

pub async fn handle(cmd: MigrateCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        MigrateCommands::UserColors {
            batch_size,
            max_users,
            seed,
            policy,
            dry_run,
        } => {
            let config = config::config();
            let mut options = BackfillOptions::from(&config.migrations);
            if let Some(max_users) = max_users {
                options.max_users = max_users;
            }
            if let Some(seed) = seed {
                options.seed = Some(seed);
            }
            if let Some(policy) = policy {
                options.commit_policy = policy;
            }
            if options.commit_policy == CommitPolicy::Detached {
                bail!("detached commits would be cut off when userctl exits; use await-all or fail-fast");
            }

            let pool = DatabaseManager::main_pool(&config.database)
                .await
                .context("failed to connect to the users database")?;
            let store = PgUserStore::new(pool)
                .with_max_writes(config.database.max_writes_per_transaction);

            let backfill = ColorBackfill::new(Arc::new(store), options);
            let (message, data) = user_colors(&backfill, batch_size, dry_run).await?;
            output_success(&output_format, &message, Some(data))?;

            DatabaseManager::close().await;
            Ok(())
        }
    }
}

/// Run or preview the colour backfill and describe the outcome
async fn user_colors(
    backfill: &ColorBackfill,
    batch_size: Option<usize>,
    dry_run: bool,
) -> anyhow::Result<(String, serde_json::Value)> {
    if dry_run {
        let plan = backfill
            .plan(batch_size)
            .await
            .context("failed to plan user colour backfill")?;
        let data = json!({
            "usersDetails": plan.summary,
            "batches": plan.batch_sizes(),
        });
        return Ok(("Dry run: no users were written".to_string(), data));
    }

    let summary = backfill
        .run(batch_size)
        .await
        .context("user colour backfill failed")?;
    Ok((
        "User colors updated successfully!".to_string(),
        json!({ "usersDetails": summary }),
    ))
}

/// Same as `handle`, against an already built engine; used by tests
pub async fn render_user_colors(
    backfill: &ColorBackfill,
    batch_size: Option<usize>,
    dry_run: bool,
    output_format: OutputFormat,
) -> anyhow::Result<String> {
    let (message, data) = user_colors(backfill, batch_size, dry_run).await?;
    render_success(&output_format, &message, Some(data))
}
