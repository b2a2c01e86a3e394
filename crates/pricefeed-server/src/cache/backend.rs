//! Cache tier backed by a local DashMap or a shared Redis.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::Pool;
use pricefeed_core::RoundRecord;
use pricefeed_storage::{CacheTier, StorageError};
use redis::AsyncCommands;

/// Above this many local entries, a `set` first drops everything expired.
const LOCAL_SWEEP_THRESHOLD: usize = 256;

/// A serialized record with its expiry.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Vec<u8>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Cache tier backend.
///
/// ## Cache Modes
///
/// - **Local**: Single-instance mode, entries live in this process only
/// - **Redis**: Multi-instance mode, every instance shares one keyspace
///
/// Entries are MessagePack-encoded [`RoundRecord`]s in both modes. Every
/// operation completes before the call returns.
#[derive(Clone)]
pub enum CacheBackend {
    Local(Arc<DashMap<String, CachedEntry>>),
    Redis(Pool),
}

impl CacheBackend {
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    pub fn new_redis(redis_pool: Pool) -> Self {
        CacheBackend::Redis(redis_pool)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        match self {
            CacheBackend::Local(map) => CacheStats {
                local_entries: map.len(),
                mode: "local".to_string(),
            },
            CacheBackend::Redis(_) => CacheStats {
                local_entries: 0,
                mode: "redis".to_string(),
            },
        }
    }

    async fn redis_connection(pool: &Pool) -> Result<deadpool_redis::Connection, StorageError> {
        pool.get()
            .await
            .map_err(|e| StorageError::connection_error(format!("Redis pool error: {e}")))
    }
}

fn encode(record: &RoundRecord) -> Result<Vec<u8>, StorageError> {
    rmp_serde::to_vec_named(record).map_err(|e| StorageError::serialization(e.to_string()))
}

fn decode(key: &str, data: &[u8]) -> Result<RoundRecord, StorageError> {
    rmp_serde::from_slice(data)
        .map_err(|e| StorageError::serialization(format!("cache entry {key}: {e}")))
}

fn redis_error(op: &str, err: redis::RedisError) -> StorageError {
    StorageError::connection_error(format!("Redis {op} error: {err}"))
}

#[async_trait]
impl CacheTier for CacheBackend {
    async fn get(&self, key: &str) -> Result<Option<RoundRecord>, StorageError> {
        match self {
            CacheBackend::Local(map) => {
                let Some(entry) = map.get(key) else {
                    return Ok(None);
                };
                if entry.is_expired() {
                    drop(entry);
                    // A concurrent set may have refreshed the key meanwhile.
                    map.remove_if(key, |_, entry| entry.is_expired());
                    tracing::debug!(key = %key, "cache entry expired");
                    return Ok(None);
                }
                decode(key, &entry.data).map(Some)
            }
            CacheBackend::Redis(pool) => {
                let mut conn = Self::redis_connection(pool).await?;
                let data: Option<Vec<u8>> =
                    conn.get(key).await.map_err(|e| redis_error("GET", e))?;
                data.map(|bytes| decode(key, &bytes)).transpose()
            }
        }
    }

    async fn set(
        &self,
        key: &str,
        record: &RoundRecord,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        let data = encode(record)?;
        match self {
            CacheBackend::Local(map) => {
                if map.len() >= LOCAL_SWEEP_THRESHOLD {
                    let before = map.len();
                    map.retain(|_, entry| !entry.is_expired());
                    tracing::debug!(swept = before - map.len(), "expired cache entries dropped");
                }
                map.insert(key.to_string(), CachedEntry::new(data, ttl));
            }
            CacheBackend::Redis(pool) => {
                // EX has second granularity
                let ttl_secs = ttl.as_secs().max(1);
                let mut conn = Self::redis_connection(pool).await?;
                conn.set_ex::<_, _, ()>(key, data, ttl_secs)
                    .await
                    .map_err(|e| redis_error("SET", e))?;
            }
        }
        tracing::debug!(key = %key, ttl_ms = %ttl.as_millis(), "cache set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self {
            CacheBackend::Local(map) => {
                map.remove(key);
            }
            CacheBackend::Redis(pool) => {
                let mut conn = Self::redis_connection(pool).await?;
                conn.del::<_, ()>(key)
                    .await
                    .map_err(|e| redis_error("DEL", e))?;
            }
        }
        tracing::debug!(key = %key, "cache invalidated");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        match self {
            CacheBackend::Local(_) => Ok(()),
            CacheBackend::Redis(pool) => {
                let mut conn = Self::redis_connection(pool).await?;
                let _: String = redis::cmd("PING")
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| redis_error("PING", e))?;
                Ok(())
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        match self {
            CacheBackend::Local(_) => "local",
            CacheBackend::Redis(_) => "redis",
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub local_entries: usize,
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use pricefeed_core::Answer;

    use super::*;

    fn record() -> RoundRecord {
        RoundRecord::new(3, Answer::from(-7), 10, 20, 3).unwrap()
    }

    #[tokio::test]
    async fn tx_reference_survives_encoding() {
        let cache = CacheBackend::new_local();
        let record = record().with_tx_reference("0xabc");

        cache.set("latest", &record, Duration::from_secs(5)).await.unwrap();

        assert_eq!(cache.get("latest").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_serialization_error() {
        let cache = CacheBackend::new_local();
        if let CacheBackend::Local(map) = &cache {
            map.insert(
                "latest".into(),
                CachedEntry::new(vec![0xc1], Duration::from_secs(5)),
            );
        }

        let err = cache.get("latest").await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization { .. }));
    }

    #[tokio::test]
    async fn expired_entries_do_not_accumulate() {
        let cache = CacheBackend::new_local();
        for round_id in 0..LOCAL_SWEEP_THRESHOLD as u64 {
            cache
                .set(&format!("round:{round_id}"), &record(), Duration::ZERO)
                .await
                .unwrap();
        }
        assert_eq!(cache.stats().local_entries, LOCAL_SWEEP_THRESHOLD);
        std::thread::sleep(Duration::from_millis(2));

        cache.set("latest", &record(), Duration::from_secs(5)).await.unwrap();

        assert_eq!(cache.stats().local_entries, 1);
        assert!(cache.get("latest").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_read_does_not_evict_a_fresh_entry() {
        let cache = CacheBackend::new_local();
        let CacheBackend::Local(map) = &cache else {
            unreachable!()
        };
        map.insert("latest".into(), CachedEntry::new(Vec::new(), Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.get("latest").await.unwrap(), None);
        assert!(map.is_empty());

        cache.set("latest", &record(), Duration::from_secs(5)).await.unwrap();
        map.remove_if("latest", |_, entry| entry.is_expired());
        assert_eq!(cache.get("latest").await.unwrap(), Some(record()));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let entry = CachedEntry::new(Vec::new(), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert!(entry.is_expired());
    }
}
