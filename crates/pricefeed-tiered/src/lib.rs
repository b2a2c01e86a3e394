//! Tiered read/write coordination for Pricefeed.
//!
//! Reads consult the cache, then the durable store, then the authoritative
//! source, stopping at the first hit and back-filling every faster tier that
//! missed. Writes are gated on the source's authorized identity, submitted
//! through the retry executor, and only then invalidate the cache and append
//! the refreshed round to the durable store.
//!
//! ```text
//! read:   cache ──miss──▶ durable ──miss──▶ source (retried)
//!           ▲               │  ▲              │
//!           └──── set ──────┘  └── insert ────┘ (+ set)
//!
//! write:  authorize ─▶ submit (retried) ─▶ refresh (retried) ─▶ del "latest" ─▶ insert
//! ```
//!
//! Every operation takes a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! bound to the inbound request; it is observed by tier I/O and by backoff
//! sleeps, and surfaces as a distinct `Cancelled` error.

pub mod error;
pub mod health;
pub mod read;
pub mod retry;
pub mod write;

pub use error::{ReadError, WriteError};
pub use health::{LivenessProber, LivenessReport, TierStatus};
pub use read::{DEFAULT_CACHE_TTL, Resolved, Tier, TieredReader};
pub use retry::{RetryError, RetryPolicy, retry};
pub use write::{WriteCoordinator, WriteReceipt};
