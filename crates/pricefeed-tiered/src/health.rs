//! Concurrent liveness probing of all three tiers.

use pricefeed_storage::{DynCacheTier, DynOracleReader, DynRoundStore};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Reachability of one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierStatus {
    pub reachable: bool,
    pub error: Option<String>,
}

impl TierStatus {
    fn up() -> Self {
        Self {
            reachable: true,
            error: None,
        }
    }

    fn down(error: impl Into<String>) -> Self {
        Self {
            reachable: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessReport {
    pub source: TierStatus,
    pub cache: TierStatus,
    pub durable: TierStatus,
}

impl LivenessReport {
    #[must_use]
    pub fn all_reachable(&self) -> bool {
        self.source.reachable && self.cache.reachable && self.durable.reachable
    }
}

/// Probes each tier once, in parallel, with no retries.
pub struct LivenessProber {
    oracle: DynOracleReader,
    cache: DynCacheTier,
    store: DynRoundStore,
}

impl LivenessProber {
    pub fn new(oracle: DynOracleReader, cache: DynCacheTier, store: DynRoundStore) -> Self {
        Self {
            oracle,
            cache,
            store,
        }
    }

    /// Probe all tiers. A tier still pending when `cancel` fires is reported
    /// as unreachable.
    pub async fn probe(&self, cancel: &CancellationToken) -> LivenessReport {
        let source = probe("source", cancel, async {
            self.oracle.latest().await.map(|_| ()).map_err(|e| e.to_string())
        });
        let cache = probe("cache", cancel, async {
            self.cache.ping().await.map_err(|e| e.to_string())
        });
        let durable = probe("durable", cancel, async {
            self.store.ping().await.map_err(|e| e.to_string())
        });

        let (source, cache, durable) = tokio::join!(source, cache, durable);
        LivenessReport {
            source,
            cache,
            durable,
        }
    }
}

async fn probe(
    tier: &'static str,
    cancel: &CancellationToken,
    check: impl Future<Output = Result<(), String>>,
) -> TierStatus {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err("probe cancelled".to_string()),
        outcome = check => outcome,
    };
    match outcome {
        Ok(()) => TierStatus::up(),
        Err(e) => {
            warn!(tier, error = %e, "Liveness probe failed");
            TierStatus::down(e)
        }
    }
}
