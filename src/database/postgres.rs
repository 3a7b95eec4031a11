use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::database::store::{StoreError, UserStore, WriteBatch, MAX_TRANSACTION_WRITES};
use crate::database::user::UserRecord;

/// Users held as JSONB documents in a single Postgres table
pub struct PgUserStore {
    pool: PgPool,
    table_name: String,
    max_writes: usize,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: "users".to_string(),
            max_writes: MAX_TRANSACTION_WRITES,
        }
    }

    pub fn with_max_writes(mut self, max_writes: usize) -> Self {
        self.max_writes = max_writes;
        self
    }

    /// Create the document table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, data JSONB NOT NULL)",
            quote_identifier(&self.table_name)
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn retrieve_all(&self, limit: usize) -> Result<Vec<UserRecord>, StoreError> {
        let sql = format!(
            "SELECT id, data FROM {} ORDER BY id LIMIT $1",
            quote_identifier(&self.table_name)
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                    StoreError::Unavailable(e.to_string())
                }
                other => StoreError::Database(other),
            })?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                let data: Value = row.try_get("data")?;
                UserRecord::from_document(id, data)
            })
            .collect()
    }

    fn open_batch(&self) -> Box<dyn WriteBatch> {
        Box::new(PgWriteBatch {
            pool: self.pool.clone(),
            upsert_sql: format!(
                "INSERT INTO {} (id, data) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
                quote_identifier(&self.table_name)
            ),
            max_writes: self.max_writes,
            writes: Vec::new(),
        })
    }

    fn max_writes_per_batch(&self) -> usize {
        self.max_writes
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

struct PgWriteBatch {
    pool: PgPool,
    upsert_sql: String,
    max_writes: usize,
    writes: Vec<(String, Value)>,
}

#[async_trait]
impl WriteBatch for PgWriteBatch {
    fn queue_write(&mut self, id: &str, record: UserRecord) {
        self.writes.push((id.to_string(), record.to_document()));
    }

    fn len(&self) -> usize {
        self.writes.len()
    }

    async fn commit(self: Box<Self>) -> Result<usize, StoreError> {
        if self.writes.len() > self.max_writes {
            return Err(StoreError::BatchTooLarge {
                ops: self.writes.len(),
                max: self.max_writes,
            });
        }

        // Dropping the transaction on an early return rolls the batch back
        let mut tx = self.pool.begin().await?;
        for (id, data) in &self.writes {
            sqlx::query(&self.upsert_sql)
                .bind(id)
                .bind(data)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(self.writes.len())
    }
}

/// Quote SQL identifier to prevent injection
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
