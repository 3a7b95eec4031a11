use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::database::{MAX_TRANSACTION_WRITES, MAX_USERS_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub migrations: MigrationConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub max_writes_per_transaction: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub batch_size: usize,
    pub max_users: usize,
    pub palette_size: u32,
    pub commit_policy: CommitPolicy,
    pub max_concurrent_commits: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub enable_request_logging: bool,
}

/// How a backfill treats its batch commits once they are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitPolicy {
    /// Wait for every batch, then report all failures together
    #[default]
    AwaitAll,
    /// Stop at the first failed batch
    FailFast,
    /// Spawn the commits and return without waiting for them
    Detached,
}

impl FromStr for CommitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "await-all" | "await_all" | "all" => Ok(Self::AwaitAll),
            "fail-fast" | "fail_fast" => Ok(Self::FailFast),
            "detached" | "fire-and-forget" => Ok(Self::Detached),
            other => Err(format!("unknown commit policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|url| !url.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_MAX_WRITES_PER_TRANSACTION") {
            self.database.max_writes_per_transaction =
                v.parse().unwrap_or(self.database.max_writes_per_transaction);
        }

        // Migration overrides
        if let Ok(v) = env::var("MIGRATION_BATCH_SIZE") {
            self.migrations.batch_size = v.parse().unwrap_or(self.migrations.batch_size);
        }
        if let Ok(v) = env::var("MIGRATION_MAX_USERS") {
            self.migrations.max_users = v.parse().unwrap_or(self.migrations.max_users);
        }
        if let Ok(v) = env::var("MIGRATION_PALETTE_SIZE") {
            self.migrations.palette_size = v.parse().unwrap_or(self.migrations.palette_size);
        }
        if let Ok(v) = env::var("MIGRATION_COMMIT_POLICY") {
            self.migrations.commit_policy = v.parse().unwrap_or(self.migrations.commit_policy);
        }
        if let Ok(v) = env::var("MIGRATION_MAX_CONCURRENT_COMMITS") {
            self.migrations.max_concurrent_commits =
                v.parse().unwrap_or(self.migrations.max_concurrent_commits);
        }
        if let Ok(v) = env::var("MIGRATION_SEED") {
            self.migrations.seed = v.parse().ok();
        }

        // API overrides
        if let Some(port) = env::var("USERS_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("USER_STORE") {
            self.api.store = match v.to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "postgres" | "pg" => StoreBackend::Postgres,
                _ => self.api.store,
            };
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        self
    }

    fn migrations_default() -> MigrationConfig {
        MigrationConfig {
            batch_size: MAX_TRANSACTION_WRITES,
            max_users: MAX_USERS_SIZE,
            palette_size: 10,
            commit_policy: CommitPolicy::AwaitAll,
            max_concurrent_commits: 4,
            seed: None,
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
                max_writes_per_transaction: MAX_TRANSACTION_WRITES,
            },
            migrations: Self::migrations_default(),
            api: ApiConfig {
                port: 3000,
                store: StoreBackend::Memory,
                enable_request_logging: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
                max_writes_per_transaction: MAX_TRANSACTION_WRITES,
            },
            migrations: Self::migrations_default(),
            api: ApiConfig {
                port: 3000,
                store: StoreBackend::Postgres,
                enable_request_logging: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
                max_writes_per_transaction: MAX_TRANSACTION_WRITES,
            },
            migrations: MigrationConfig {
                max_concurrent_commits: 8,
                ..Self::migrations_default()
            },
            api: ApiConfig {
                port: 3000,
                store: StoreBackend::Postgres,
                enable_request_logging: false,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
