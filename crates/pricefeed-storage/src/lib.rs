//! Tier abstraction layer for Pricefeed.
//!
//! This crate defines the contracts of the three tiers consulted by the
//! coordinators, ordered from fastest to slowest:
//!
//! - [`CacheTier`]: short-lived projections of records under string keys
//! - [`RoundStore`]: the durable, append-only copy of observed rounds
//! - [`OracleReader`] / [`OracleWriter`]: the authoritative source
//!
//! Backends live in their own crates (`pricefeed-db-postgres`,
//! `pricefeed-db-memory`, `pricefeed-chain`) and in the server's cache module.

pub mod error;
pub mod key;
pub mod traits;

pub use error::{ErrorCategory, OracleError, StorageError};
pub use key::RecordKey;
pub use traits::{CacheTier, OracleReader, OracleWriter, RoundStore};

/// Type alias for a shareable cache tier.
pub type DynCacheTier = std::sync::Arc<dyn CacheTier>;

/// Type alias for a shareable durable tier.
pub type DynRoundStore = std::sync::Arc<dyn RoundStore>;

/// Type alias for a shareable authoritative-source reader.
pub type DynOracleReader = std::sync::Arc<dyn OracleReader>;

/// Type alias for a shareable authoritative-source writer.
pub type DynOracleWriter = std::sync::Arc<dyn OracleWriter>;
