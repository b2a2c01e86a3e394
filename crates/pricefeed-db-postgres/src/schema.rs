//! Embedded schema for the `oracle_rounds` table.
//!
//! Steps are applied through the sqlx migrator, which records them in
//! `_sqlx_migrations`; re-applying is a no-op.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

struct SchemaStep {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

// Append only. Versions must increase.
const STEPS: &[SchemaStep] = &[SchemaStep {
    version: 20250101000001,
    name: "oracle_rounds",
    sql: include_str!("../migrations/20250101000001_oracle_rounds.sql"),
}];

fn migrator() -> Migrator {
    let migrations = STEPS
        .iter()
        .map(|step| {
            Migration::new(
                step.version,
                Cow::Borrowed(step.name),
                MigrationType::Simple,
                Cow::Borrowed(step.sql),
                false,
            )
        })
        .collect::<Vec<_>>();

    Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    }
}

/// Version of the newest embedded step.
pub fn target_version() -> Option<i64> {
    STEPS.last().map(|step| step.version)
}

/// Brings the database up to [`target_version`].
#[instrument(skip(pool))]
pub async fn apply(pool: &PgPool) -> Result<()> {
    migrator()
        .run(pool)
        .await
        .map_err(|e| PostgresError::Migration(e.to_string()))?;
    info!(version = ?target_version(), "oracle_rounds schema is current");
    Ok(())
}

/// Versions recorded as applied, oldest first.
pub async fn applied_versions(pool: &PgPool) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> =
        query_as("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(version,)| version).collect())
}
