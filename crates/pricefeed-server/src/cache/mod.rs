//! Cache tier backends.

pub mod backend;

pub use backend::{CacheBackend, CacheStats, CachedEntry};
