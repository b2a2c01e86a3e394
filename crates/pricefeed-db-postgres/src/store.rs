//! PostgreSQL implementation of the `RoundStore` trait.

use async_trait::async_trait;
use pricefeed_core::RoundRecord;
use pricefeed_storage::{RoundStore, StorageError};
use sqlx_core::pool::PoolOptions;
use sqlx_core::query::query;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::PostgresError;
use crate::{queries, schema};

/// Durable, append-only store of oracle rounds.
#[derive(Debug, Clone)]
pub struct PostgresRoundStore {
    pool: PgPool,
}

impl PostgresRoundStore {
    /// Opens a pool and, if configured, applies the embedded schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the database is
    /// unreachable, or the schema cannot be applied.
    #[instrument(skip_all, fields(url = %config.redacted_url()))]
    pub async fn connect(config: PostgresConfig) -> Result<Self, StorageError> {
        config.validate()?;

        let pool = PoolOptions::<Postgres>::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(config.url())
            .await
            .map_err(PostgresError::from)?;
        info!(pool_size = config.pool_size, "Round store connected");

        if config.run_migrations {
            schema::apply(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Wraps an existing pool. The schema is assumed to be in place.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RoundStore for PostgresRoundStore {
    async fn insert(&self, record: &RoundRecord) -> Result<(), StorageError> {
        let inserted = queries::insert_round(&self.pool, record).await?;
        if !inserted {
            debug!(round_id = record.round_id, "Round already stored, insert ignored");
        }
        Ok(())
    }

    async fn find_by_round_id(&self, round_id: u64) -> Result<Option<RoundRecord>, StorageError> {
        queries::find_by_round_id(&self.pool, round_id).await
    }

    async fn find_latest(&self) -> Result<Option<RoundRecord>, StorageError> {
        queries::find_latest(&self.pool).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
