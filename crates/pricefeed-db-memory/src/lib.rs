//! In-memory durable round store for Pricefeed.
//!
//! Intended for tests and single-process deployments where rounds need not
//! survive a restart. Records are kept ordered by round id so the latest
//! round is always the last entry.
//!
//! # Example
//!
//! ```ignore
//! use pricefeed_db_memory::InMemoryRoundStore;
//! use pricefeed_storage::RoundStore;
//!
//! let store = InMemoryRoundStore::new();
//! store.insert(&record).await?;
//! let latest = store.find_latest().await?;
//! ```

mod store;

pub use pricefeed_storage::{RoundStore, StorageError};
pub use store::InMemoryRoundStore;

/// Creates a new, empty in-memory round store.
pub fn create_round_store() -> pricefeed_storage::DynRoundStore {
    std::sync::Arc::new(InMemoryRoundStore::new())
}
