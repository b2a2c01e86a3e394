//! Core value types shared by every Pricefeed tier.
//!
//! A [`RoundRecord`] is one observation of the oracle at a discrete round. It
//! flows unchanged through the cache, the durable store and the authoritative
//! source, so the answer is carried as an arbitrary-precision [`Answer`] and
//! never narrowed to a fixed-width integer.

pub mod answer;
pub mod error;
pub mod identity;
pub mod record;

pub use answer::Answer;
pub use error::{CoreError, Result};
pub use identity::SignerIdentity;
pub use record::{RoundRecord, parse_round_id};
