//! Cache tier backends.
//!
//! Redis tests use testcontainers and are ignored by default.

use std::time::Duration;

use pricefeed_core::{Answer, RoundRecord};
use pricefeed_server::{CacheBackend, RedisConfig, create_cache_backend};
use pricefeed_storage::CacheTier;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::redis::Redis;

fn record(round_id: u64) -> RoundRecord {
    RoundRecord::new(
        round_id,
        Answer::parse("-98765432109876543210").unwrap(),
        1_700_000_000,
        1_700_000_001,
        round_id,
    )
    .unwrap()
}

#[tokio::test]
async fn test_local_cache_get_set_delete() {
    let cache = CacheBackend::new_local();

    cache
        .set("round:4", &record(4), Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(cache.get("round:4").await.unwrap(), Some(record(4)));
    assert_eq!(cache.stats().local_entries, 1);

    cache.delete("round:4").await.unwrap();
    assert_eq!(cache.get("round:4").await.unwrap(), None);

    // Deleting a missing key is not an error
    cache.delete("round:4").await.unwrap();
    assert_eq!(cache.backend_name(), "local");
}

#[tokio::test]
async fn test_local_cache_expiration() {
    let cache = CacheBackend::new_local();

    cache
        .set("latest", &record(1), Duration::from_millis(100))
        .await
        .unwrap();
    assert!(cache.get("latest").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(cache.get("latest").await.unwrap().is_none());
    assert_eq!(cache.stats().local_entries, 0);
}

#[tokio::test]
async fn test_disabled_redis_falls_back_to_local() {
    let cache = create_cache_backend(&RedisConfig::default()).await;
    assert_eq!(cache.stats().mode, "local");
}

#[tokio::test]
async fn test_unreachable_redis_falls_back_to_local() {
    let config = RedisConfig {
        enabled: true,
        url: "redis://127.0.0.1:1".into(),
        timeout_ms: 200,
        ..RedisConfig::default()
    };
    let cache = create_cache_backend(&config).await;
    assert_eq!(cache.stats().mode, "local");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_cache_round_trip() {
    let container = Redis::default()
        .start()
        .await
        .expect("start redis container");
    let host_port = container.get_host_port_ipv4(6379).await.expect("get port");

    let config = RedisConfig {
        enabled: true,
        url: format!("redis://127.0.0.1:{host_port}"),
        ..RedisConfig::default()
    };
    let cache = create_cache_backend(&config).await;
    assert_eq!(cache.backend_name(), "redis");
    cache.ping().await.expect("ping");

    cache
        .set("latest", &record(9), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(cache.get("latest").await.unwrap(), Some(record(9)));

    cache.delete("latest").await.unwrap();
    assert_eq!(cache.get("latest").await.unwrap(), None);

    // Sub-second TTLs are rounded up to one second
    cache
        .set("round:9", &record(9), Duration::from_millis(10))
        .await
        .unwrap();
    assert!(cache.get("round:9").await.unwrap().is_some());
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(cache.get("round:9").await.unwrap().is_none());
}
