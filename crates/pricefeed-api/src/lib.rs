//! HTTP wire types for Pricefeed.
//!
//! Field names follow the oracle's own vocabulary in camelCase. Answers are
//! always JSON strings so values wider than 64 bits survive clients that
//! parse numbers as doubles.

mod error;
mod types;

pub use error::{ApiError, ErrorBody};
pub use types::{HealthResponse, RoundResponse, UpdatePriceRequest, UpdatePriceResponse};
