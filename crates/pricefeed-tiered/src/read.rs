//! Read-through resolution across the three tiers.
//!
//! Tiers are modelled as an ordered chain of lookup strategies. The first
//! strategy that produces a record wins; every strategy ahead of it in the
//! chain is then back-filled with that record. Cache and durable failures
//! are logged and treated as misses. Only the source is retried, and only
//! its failure fails the read.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use pricefeed_core::{RoundRecord, parse_round_id};
use pricefeed_storage::{DynCacheTier, DynOracleReader, DynRoundStore, OracleError, RecordKey};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ReadError;
use crate::retry::{RetryPolicy, retry};

/// How long back-filled cache entries live.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);

/// The tier that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Cache,
    Durable,
    Source,
}

impl Tier {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Durable => "durable",
            Self::Source => "source",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record together with the tier it was served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub record: RoundRecord,
    pub tier: Tier,
}

/// Resolves the latest record or a specific round through the tier chain.
pub struct TieredReader {
    cache: CacheLookup,
    durable: DurableLookup,
    source: SourceLookup,
}

impl TieredReader {
    /// Create a reader with the default cache TTL and retry policy.
    pub fn new(cache: DynCacheTier, store: DynRoundStore, oracle: DynOracleReader) -> Self {
        Self {
            cache: CacheLookup {
                cache,
                ttl: DEFAULT_CACHE_TTL,
            },
            durable: DurableLookup { store },
            source: SourceLookup {
                oracle,
                policy: RetryPolicy::default(),
            },
        }
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.source.policy = policy;
        self
    }

    /// Resolve the record with the greatest round id.
    ///
    /// Cancellation before a hit yields [`ReadError::Cancelled`]. Once a tier
    /// has produced the record, cancellation only cuts the back-fill short.
    pub async fn latest(&self, cancel: &CancellationToken) -> Result<Resolved, ReadError> {
        self.resolve(RecordKey::Latest, cancel).await
    }

    /// Resolve a round from a caller-supplied identifier.
    ///
    /// A malformed identifier is rejected before any tier is consulted. A
    /// source answer for a different round counts as a failed attempt and
    /// is never written back.
    pub async fn by_round_id(
        &self,
        raw_round_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolved, ReadError> {
        let round_id = parse_round_id(raw_round_id)?;
        self.round(round_id, cancel).await
    }

    /// Resolve an already validated round id.
    pub async fn round(
        &self,
        round_id: u64,
        cancel: &CancellationToken,
    ) -> Result<Resolved, ReadError> {
        self.resolve(RecordKey::Round(round_id), cancel).await
    }

    fn chain(&self) -> [&dyn TierLookup; 3] {
        [&self.cache, &self.durable, &self.source]
    }

    async fn resolve(
        &self,
        key: RecordKey,
        cancel: &CancellationToken,
    ) -> Result<Resolved, ReadError> {
        let chain = self.chain();

        for (position, lookup) in chain.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ReadError::Cancelled);
            }

            let Some(record) = lookup.lookup(key, cancel).await? else {
                continue;
            };

            let tier = lookup.tier();
            debug!(%key, %tier, round_id = record.round_id, "Record resolved");

            // Back-fill is abandoned on cancellation; the record is still returned.
            for faster in &chain[..position] {
                if until_cancelled(cancel, faster.write_back(key, &record))
                    .await
                    .is_err()
                {
                    debug!(%key, tier = %faster.tier(), "Write-back abandoned, request cancelled");
                    break;
                }
            }

            return Ok(Resolved { record, tier });
        }

        Err(ReadError::Unresolved { key })
    }
}

/// One step of the read chain.
#[async_trait]
trait TierLookup: Send + Sync {
    fn tier(&self) -> Tier;

    /// `Ok(None)` is a miss; the next tier is consulted.
    async fn lookup(
        &self,
        key: RecordKey,
        cancel: &CancellationToken,
    ) -> Result<Option<RoundRecord>, ReadError>;

    /// Back-fill this tier after a slower tier produced `record`.
    ///
    /// Failures are logged and swallowed.
    async fn write_back(&self, key: RecordKey, record: &RoundRecord);
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, ReadError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReadError::Cancelled),
        value = fut => Ok(value),
    }
}

struct CacheLookup {
    cache: DynCacheTier,
    ttl: Duration,
}

#[async_trait]
impl TierLookup for CacheLookup {
    fn tier(&self) -> Tier {
        Tier::Cache
    }

    async fn lookup(
        &self,
        key: RecordKey,
        cancel: &CancellationToken,
    ) -> Result<Option<RoundRecord>, ReadError> {
        let cache_key = key.cache_key();
        match until_cancelled(cancel, self.cache.get(&cache_key)).await? {
            Ok(hit) => Ok(hit),
            Err(e) => {
                warn!(
                    %key,
                    backend = self.cache.backend_name(),
                    category = %e.category(),
                    error = %e,
                    "Cache lookup failed, treating as miss"
                );
                Ok(None)
            }
        }
    }

    async fn write_back(&self, key: RecordKey, record: &RoundRecord) {
        if let Err(e) = self.cache.set(&key.cache_key(), record, self.ttl).await {
            warn!(
                %key,
                backend = self.cache.backend_name(),
                error = %e,
                "Failed to populate cache"
            );
        }
    }
}

struct DurableLookup {
    store: DynRoundStore,
}

#[async_trait]
impl TierLookup for DurableLookup {
    fn tier(&self) -> Tier {
        Tier::Durable
    }

    async fn lookup(
        &self,
        key: RecordKey,
        cancel: &CancellationToken,
    ) -> Result<Option<RoundRecord>, ReadError> {
        let found = match key {
            RecordKey::Latest => until_cancelled(cancel, self.store.find_latest()).await?,
            RecordKey::Round(id) => {
                until_cancelled(cancel, self.store.find_by_round_id(id)).await?
            }
        };
        match found {
            Ok(hit) => Ok(hit),
            Err(e) => {
                warn!(
                    %key,
                    backend = self.store.backend_name(),
                    category = %e.category(),
                    error = %e,
                    "Durable lookup failed, treating as miss"
                );
                Ok(None)
            }
        }
    }

    async fn write_back(&self, key: RecordKey, record: &RoundRecord) {
        if let Err(e) = self.store.insert(record).await {
            warn!(
                %key,
                round_id = record.round_id,
                backend = self.store.backend_name(),
                error = %e,
                "Failed to persist record"
            );
        }
    }
}

struct SourceLookup {
    oracle: DynOracleReader,
    policy: RetryPolicy,
}

#[async_trait]
impl TierLookup for SourceLookup {
    fn tier(&self) -> Tier {
        Tier::Source
    }

    async fn lookup(
        &self,
        key: RecordKey,
        cancel: &CancellationToken,
    ) -> Result<Option<RoundRecord>, ReadError> {
        let fetched = match key {
            RecordKey::Latest => retry(&self.policy, cancel, || self.oracle.latest()).await,
            RecordKey::Round(id) => {
                retry(&self.policy, cancel, || async move {
                    let record = self.oracle.by_round_id(id).await?;
                    if record.round_id != id {
                        return Err(OracleError::decode(format!(
                            "requested round {id}, source answered round {}",
                            record.round_id
                        )));
                    }
                    Ok(record)
                })
                .await
            }
        };
        fetched
            .map(Some)
            .map_err(|e| ReadError::from_source(key, e))
    }

    async fn write_back(&self, _key: RecordKey, _record: &RoundRecord) {}
}
