//! SQL for the `oracle_rounds` table.
//!
//! Rows are append-only: a second insert for an existing `round_id` is
//! discarded by the database and reported as not inserted.

use chrono::{DateTime, Utc};
use pricefeed_core::{Answer, RoundRecord};
use pricefeed_storage::StorageError;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use crate::error::PostgresError;

const INSERT_ROUND: &str = r#"
    INSERT INTO oracle_rounds
        (round_id, answer, started_at, updated_at, answered_in_round, tx_hash)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (round_id) DO NOTHING
"#;

const SELECT_BY_ROUND_ID: &str = r#"
    SELECT round_id, answer, started_at, updated_at, answered_in_round, tx_hash
    FROM oracle_rounds
    WHERE round_id = $1
"#;

const SELECT_LATEST: &str = r#"
    SELECT round_id, answer, started_at, updated_at, answered_in_round, tx_hash
    FROM oracle_rounds
    ORDER BY round_id DESC
    LIMIT 1
"#;

type RoundRow = (i64, String, DateTime<Utc>, DateTime<Utc>, i64, Option<String>);

/// Appends a record. Returns `false` if the round was already stored.
pub async fn insert_round(pool: &PgPool, record: &RoundRecord) -> Result<bool, StorageError> {
    let round_id = to_db_id("round_id", record.round_id)?;
    let answered_in_round = to_db_id("answered_in_round", record.answered_in_round)?;
    let started_at = to_db_time("started_at", record.started_at)?;
    let updated_at = to_db_time("updated_at", record.updated_at)?;

    let result = query(INSERT_ROUND)
        .bind(round_id)
        .bind(record.answer.to_string())
        .bind(started_at)
        .bind(updated_at)
        .bind(answered_in_round)
        .bind(record.tx_reference.as_deref())
        .execute(pool)
        .await
        .map_err(PostgresError::from)?;

    Ok(result.rows_affected() == 1)
}

/// Reads the record of exactly `round_id`.
pub async fn find_by_round_id(
    pool: &PgPool,
    round_id: u64,
) -> Result<Option<RoundRecord>, StorageError> {
    // Ids beyond BIGINT can never have been stored.
    let Ok(round_id) = i64::try_from(round_id) else {
        return Ok(None);
    };

    let row: Option<RoundRow> = query_as(SELECT_BY_ROUND_ID)
        .bind(round_id)
        .fetch_optional(pool)
        .await
        .map_err(PostgresError::from)?;

    row.map(row_to_record).transpose().map_err(Into::into)
}

/// Reads the record with the greatest `round_id`.
pub async fn find_latest(pool: &PgPool) -> Result<Option<RoundRecord>, StorageError> {
    let row: Option<RoundRow> = query_as(SELECT_LATEST)
        .fetch_optional(pool)
        .await
        .map_err(PostgresError::from)?;

    row.map(row_to_record).transpose().map_err(Into::into)
}

fn to_db_id(field: &str, value: u64) -> Result<i64, StorageError> {
    i64::try_from(value)
        .map_err(|_| StorageError::invalid_record(format!("{field} {value} exceeds BIGINT")))
}

fn to_db_time(field: &str, secs: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| StorageError::invalid_record(format!("{field} {secs} is out of range")))
}

fn from_db_id(round_id: i64, field: &str, value: i64) -> Result<u64, PostgresError> {
    u64::try_from(value)
        .map_err(|_| PostgresError::corrupt_row(round_id, format!("negative {field}: {value}")))
}

fn row_to_record(row: RoundRow) -> Result<RoundRecord, PostgresError> {
    let (round_id, answer, started_at, updated_at, answered_in_round, tx_hash) = row;

    let answer =
        Answer::parse(&answer).map_err(|e| PostgresError::corrupt_row(round_id, e.to_string()))?;

    let record = RoundRecord::new(
        from_db_id(round_id, "round_id", round_id)?,
        answer,
        started_at.timestamp(),
        updated_at.timestamp(),
        from_db_id(round_id, "answered_in_round", answered_in_round)?,
    )
    .map_err(|e| PostgresError::corrupt_row(round_id, e.to_string()))?;

    Ok(match tx_hash {
        Some(tx) => record.with_tx_reference(tx),
        None => record,
    })
}
