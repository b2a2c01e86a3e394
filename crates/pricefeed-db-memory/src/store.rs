use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use pricefeed_core::RoundRecord;
use pricefeed_storage::{RoundStore, StorageError};

/// Append-only store backed by an ordered map.
///
/// The first record written for a round id is kept; later inserts for the
/// same id are silently ignored.
#[derive(Debug, Default)]
pub struct InMemoryRoundStore {
    rounds: RwLock<BTreeMap<u64, RoundRecord>>,
}

impl InMemoryRoundStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rounds.
    pub fn len(&self) -> usize {
        self.rounds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.read().is_empty()
    }
}

#[async_trait]
impl RoundStore for InMemoryRoundStore {
    async fn insert(&self, record: &RoundRecord) -> Result<(), StorageError> {
        self.rounds
            .write()
            .entry(record.round_id)
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn find_by_round_id(&self, round_id: u64) -> Result<Option<RoundRecord>, StorageError> {
        Ok(self.rounds.read().get(&round_id).cloned())
    }

    async fn find_latest(&self) -> Result<Option<RoundRecord>, StorageError> {
        Ok(self.rounds.read().values().next_back().cloned())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
