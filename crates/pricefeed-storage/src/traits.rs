//! Tier contracts consumed by the coordinators.
//!
//! Every implementation must be thread-safe (`Send + Sync`): a single handle
//! is constructed at process start and shared by all in-flight requests.

use std::time::Duration;

use async_trait::async_trait;
use pricefeed_core::{Answer, RoundRecord, SignerIdentity};

use crate::error::{OracleError, StorageError};

/// The fast, short-lived tier.
///
/// Entries are time-boxed projections of a [`RoundRecord`] with no identity
/// beyond their key.
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Returns the cached record, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<RoundRecord>, StorageError>;

    /// Stores a record under `key` for `ttl`, replacing any previous entry.
    async fn set(&self, key: &str, record: &RoundRecord, ttl: Duration)
    -> Result<(), StorageError>;

    /// Removes the entry under `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Returns the name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}

/// The durable, append-only tier.
#[async_trait]
pub trait RoundStore: Send + Sync {
    /// Appends a record.
    ///
    /// A record whose `round_id` is already stored is left untouched and the
    /// call succeeds; stored records are immutable.
    async fn insert(&self, record: &RoundRecord) -> Result<(), StorageError>;

    /// Returns the record of exactly `round_id`.
    async fn find_by_round_id(&self, round_id: u64) -> Result<Option<RoundRecord>, StorageError>;

    /// Returns the stored record with the greatest `round_id`.
    async fn find_latest(&self) -> Result<Option<RoundRecord>, StorageError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Returns the name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}

/// Read access to the authoritative source.
///
/// Each call is a single, possibly slow or rate-limited, request. Callers wrap
/// these in the retry executor.
#[async_trait]
pub trait OracleReader: Send + Sync {
    /// Fetches the most recent round.
    async fn latest(&self) -> Result<RoundRecord, OracleError>;

    /// Fetches one specific round.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::RoundNotFound` if the round was never answered.
    async fn by_round_id(&self, round_id: u64) -> Result<RoundRecord, OracleError>;
}

/// Write access to the authoritative source.
#[async_trait]
pub trait OracleWriter: Send + Sync {
    /// Returns the identity currently allowed to submit new values.
    async fn current_authorized_identity(&self) -> Result<SignerIdentity, OracleError>;

    /// Checks, without any I/O, that `value` is representable by the source.
    ///
    /// The default accepts every value.
    fn check_value(&self, value: &Answer) -> Result<(), OracleError> {
        let _ = value;
        Ok(())
    }

    /// Submits a new value and returns the transaction reference.
    async fn submit(&self, value: &Answer) -> Result<String, OracleError>;
}
