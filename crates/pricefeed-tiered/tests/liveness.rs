mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{FakeCache, FakeOracle, FakeStore, record};
use pricefeed_tiered::LivenessProber;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn all_tiers_reachable() {
    let oracle = FakeOracle::new(record(1, 100));
    let prober = LivenessProber::new(
        oracle.clone(),
        Arc::new(FakeCache::default()),
        Arc::new(FakeStore::default()),
    );

    let report = prober.probe(&CancellationToken::new()).await;

    assert!(report.all_reachable());
    assert_eq!(report.source.error, None);
}

#[tokio::test]
async fn each_tier_is_reported_independently_and_never_retried() {
    let oracle = FakeOracle::new(record(1, 100));
    oracle.fail_reads(usize::MAX);
    let prober = LivenessProber::new(
        oracle.clone(),
        Arc::new(FakeCache::default()),
        FakeStore::failing(),
    );

    let report = prober.probe(&CancellationToken::new()).await;

    assert!(!report.all_reachable());
    assert!(!report.source.reachable);
    assert!(report.cache.reachable);
    assert!(!report.durable.reachable);
    assert!(report.durable.error.as_deref().unwrap().contains("store unavailable"));
    assert_eq!(oracle.latest_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_probe_reports_tiers_down() {
    let oracle = FakeOracle::new(record(1, 100));
    let prober = LivenessProber::new(
        oracle.clone(),
        Arc::new(FakeCache::default()),
        Arc::new(FakeStore::default()),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = prober.probe(&cancel).await;

    assert!(!report.source.reachable);
    assert!(!report.cache.reachable);
    assert!(!report.durable.reachable);
}
