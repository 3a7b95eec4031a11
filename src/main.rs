use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use users_api_rust::config::{self, StoreBackend};
use users_api_rust::database::{DatabaseManager, MemoryUserStore, PgUserStore, UserStore};
use users_api_rust::handlers::{self, AppState};
use users_api_rust::migrations::{BackfillOptions, ColorBackfill};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, USER_STORE, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Users API in {:?} mode", config.environment);

    let store: Arc<dyn UserStore> = match config.api.store {
        StoreBackend::Postgres => {
            let pool = DatabaseManager::main_pool(&config.database).await?;
            let store = PgUserStore::new(pool)
                .with_max_writes(config.database.max_writes_per_transaction);
            store.ensure_schema().await?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            if !users_api_rust::is_development!() {
                tracing::warn!("Serving from the in-memory user store outside development");
            }
            Arc::new(
                MemoryUserStore::new().with_max_writes(config.database.max_writes_per_transaction),
            )
        }
    };

    let backfill = ColorBackfill::new(store, BackfillOptions::from(&config.migrations));
    let app = handlers::router(AppState::new(backfill), config.api.enable_request_logging);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Users API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    DatabaseManager::close().await;
    Ok(())
}
