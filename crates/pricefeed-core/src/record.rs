//! The Numeric Record carried through every tier.

use serde::{Deserialize, Serialize};

use crate::answer::Answer;
use crate::error::CoreError;

/// One observation of the oracle at a discrete round.
///
/// `round_id` identifies the record. Once durably stored a record is never
/// updated; the latest record is the one with the greatest `round_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_id: u64,
    pub answer: Answer,
    /// Unix seconds.
    pub started_at: i64,
    /// Unix seconds, never earlier than `started_at`.
    pub updated_at: i64,
    /// Round in which the answer was actually computed; may lag `round_id`.
    pub answered_in_round: u64,
    /// Transaction hash, present only on records produced by a local write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_reference: Option<String>,
}

impl RoundRecord {
    /// Build a record observed by a read, validating the timestamp order.
    pub fn new(
        round_id: u64,
        answer: Answer,
        started_at: i64,
        updated_at: i64,
        answered_in_round: u64,
    ) -> Result<Self, CoreError> {
        if updated_at < started_at {
            return Err(CoreError::InvalidTimestamps {
                started_at,
                updated_at,
            });
        }
        Ok(Self {
            round_id,
            answer,
            started_at,
            updated_at,
            answered_in_round,
            tx_reference: None,
        })
    }

    /// Attach the transaction that produced this round.
    #[must_use]
    pub fn with_tx_reference(mut self, tx_reference: impl Into<String>) -> Self {
        self.tx_reference = Some(tx_reference.into());
        self
    }
}

/// Parse a round identifier supplied by a caller.
///
/// Only plain ASCII digits are accepted: no sign, no whitespace, and the
/// value must fit in 64 bits.
pub fn parse_round_id(raw: &str) -> Result<u64, CoreError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::invalid_round_id(raw));
    }
    raw.parse::<u64>()
        .map_err(|_| CoreError::invalid_round_id(raw))
}
