//! Counting in-process fakes for the three tiers.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pricefeed_core::{Answer, RoundRecord, SignerIdentity};
use pricefeed_storage::{
    CacheTier, OracleError, OracleReader, OracleWriter, RoundStore, StorageError,
};

pub const SIGNER: &str = "0x00000000000000000000000000000000000000aa";
pub const OTHER: &str = "0x00000000000000000000000000000000000000bb";

pub fn record(round_id: u64, answer: i64) -> RoundRecord {
    RoundRecord::new(round_id, Answer::from(answer), 1_700_000_000, 1_700_000_010, round_id)
        .unwrap()
}

pub fn identity(raw: &str) -> SignerIdentity {
    SignerIdentity::parse(raw).unwrap()
}

#[derive(Default)]
pub struct FakeCache {
    pub entries: Mutex<HashMap<String, (RoundRecord, Duration)>>,
    pub fail: AtomicBool,
    /// `set` never completes.
    pub stall_sets: AtomicBool,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub deletes: Mutex<Vec<String>>,
}

impl FakeCache {
    pub fn with_entry(key: &str, record: RoundRecord) -> Arc<Self> {
        let cache = Self::default();
        cache
            .entries
            .lock()
            .insert(key.to_string(), (record, Duration::from_secs(10)));
        Arc::new(cache)
    }

    pub fn failing() -> Arc<Self> {
        let cache = Self::default();
        cache.fail.store(true, Ordering::SeqCst);
        Arc::new(cache)
    }

    pub fn entry(&self, key: &str) -> Option<(RoundRecord, Duration)> {
        self.entries.lock().get(key).cloned()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::connection_error("cache unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheTier for FakeCache {
    async fn get(&self, key: &str) -> Result<Option<RoundRecord>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.entries.lock().get(key).map(|(r, _)| r.clone()))
    }

    async fn set(
        &self,
        key: &str,
        record: &RoundRecord,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.stall_sets.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.check()?;
        self.entries
            .lock()
            .insert(key.to_string(), (record.clone(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.deletes.lock().push(key.to_string());
        self.check()?;
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check()
    }

    fn backend_name(&self) -> &'static str {
        "fake-cache"
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub rounds: Mutex<BTreeMap<u64, RoundRecord>>,
    pub fail: AtomicBool,
    /// `insert` never completes.
    pub stall_inserts: AtomicBool,
    pub lookups: AtomicUsize,
    pub inserts: AtomicUsize,
}

impl FakeStore {
    pub fn with_records(records: impl IntoIterator<Item = RoundRecord>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut rounds = store.rounds.lock();
            for r in records {
                rounds.insert(r.round_id, r);
            }
        }
        Arc::new(store)
    }

    pub fn failing() -> Arc<Self> {
        let store = Self::default();
        store.fail.store(true, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn get(&self, round_id: u64) -> Option<RoundRecord> {
        self.rounds.lock().get(&round_id).cloned()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::connection_error("store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RoundStore for FakeStore {
    async fn insert(&self, record: &RoundRecord) -> Result<(), StorageError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.stall_inserts.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.check()?;
        self.rounds
            .lock()
            .entry(record.round_id)
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn find_by_round_id(&self, round_id: u64) -> Result<Option<RoundRecord>, StorageError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.get(round_id))
    }

    async fn find_latest(&self) -> Result<Option<RoundRecord>, StorageError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.rounds.lock().values().next_back().cloned())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check()
    }

    fn backend_name(&self) -> &'static str {
        "fake-store"
    }
}

/// A scripted source. Each queue is consumed front to back; once a queue is
/// drained, the fallback behaviour applies.
pub struct FakeOracle {
    pub latest: Mutex<RoundRecord>,
    pub rounds: Mutex<BTreeMap<u64, RoundRecord>>,
    pub read_failures: AtomicUsize,
    pub latest_calls: AtomicUsize,
    pub round_calls: AtomicUsize,

    pub owner: Mutex<Result<SignerIdentity, String>>,
    pub owner_calls: AtomicUsize,
    pub submit_results: Mutex<VecDeque<Result<String, OracleError>>>,
    pub submitted: Mutex<Vec<String>>,
    /// Round produced by the next successful submit.
    pub next_round: Mutex<Option<RoundRecord>>,
}

impl FakeOracle {
    pub fn new(latest: RoundRecord) -> Arc<Self> {
        let mut rounds = BTreeMap::new();
        rounds.insert(latest.round_id, latest.clone());
        Arc::new(Self {
            latest: Mutex::new(latest),
            rounds: Mutex::new(rounds),
            read_failures: AtomicUsize::new(0),
            latest_calls: AtomicUsize::new(0),
            round_calls: AtomicUsize::new(0),
            owner: Mutex::new(Ok(identity(SIGNER))),
            owner_calls: AtomicUsize::new(0),
            submit_results: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            next_round: Mutex::new(None),
        })
    }

    /// The next `n` reads fail with a transport error.
    pub fn fail_reads(&self, n: usize) {
        self.read_failures.store(n, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst) + self.round_calls.load(Ordering::SeqCst)
    }

    fn take_read_failure(&self) -> Result<(), OracleError> {
        let remaining = self.read_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.read_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(OracleError::transport("connection reset"));
        }
        Ok(())
    }
}

#[async_trait]
impl OracleReader for FakeOracle {
    async fn latest(&self) -> Result<RoundRecord, OracleError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.take_read_failure()?;
        Ok(self.latest.lock().clone())
    }

    async fn by_round_id(&self, round_id: u64) -> Result<RoundRecord, OracleError> {
        self.round_calls.fetch_add(1, Ordering::SeqCst);
        self.take_read_failure()?;
        self.rounds
            .lock()
            .get(&round_id)
            .cloned()
            .ok_or(OracleError::RoundNotFound { round_id })
    }
}

#[async_trait]
impl OracleWriter for FakeOracle {
    async fn current_authorized_identity(&self) -> Result<SignerIdentity, OracleError> {
        self.owner_calls.fetch_add(1, Ordering::SeqCst);
        self.owner.lock().clone().map_err(OracleError::transport)
    }

    fn check_value(&self, value: &Answer) -> Result<(), OracleError> {
        if value.as_bigint().magnitude().to_string().len() > 78 {
            return Err(OracleError::invalid_value("out of range"));
        }
        Ok(())
    }

    async fn submit(&self, value: &Answer) -> Result<String, OracleError> {
        self.submitted.lock().push(value.to_string());
        if let Some(result) = self.submit_results.lock().pop_front() {
            result?;
        }
        if let Some(next) = self.next_round.lock().take() {
            self.rounds.lock().insert(next.round_id, next.clone());
            *self.latest.lock() = next;
        }
        Ok(format!("0xtx{}", self.submitted.lock().len()))
    }
}
