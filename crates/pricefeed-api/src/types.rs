use pricefeed_core::RoundRecord;
use pricefeed_tiered::{LivenessReport, WriteReceipt};
use serde::{Deserialize, Serialize};

/// Body of `GET /latestPrice` and `GET /round/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResponse {
    pub round_id: u64,
    pub answer: String,
    pub started_at: i64,
    pub updated_at: i64,
    pub answered_in_round: u64,
}

impl From<&RoundRecord> for RoundResponse {
    fn from(record: &RoundRecord) -> Self {
        Self {
            round_id: record.round_id,
            answer: record.answer.to_string(),
            started_at: record.started_at,
            updated_at: record.updated_at,
            answered_in_round: record.answered_in_round,
        }
    }
}

/// Body of `POST /updatePrice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePriceRequest {
    /// Decimal integer, optionally signed.
    pub new_answer: String,
}

/// Response of an accepted `POST /updatePrice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePriceResponse {
    pub tx_hash: String,
    #[serde(flatten)]
    pub round: RoundResponse,
}

impl From<&WriteReceipt> for UpdatePriceResponse {
    fn from(receipt: &WriteReceipt) -> Self {
        Self {
            tx_hash: receipt.tx_reference.clone(),
            round: RoundResponse::from(&receipt.record),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` when every tier is reachable, `degraded` otherwise.
    pub status: String,
    pub rpc_connected: bool,
    pub redis_connected: bool,
    pub postgres_connected: bool,
}

impl From<&LivenessReport> for HealthResponse {
    fn from(report: &LivenessReport) -> Self {
        let status = if report.all_reachable() { "ok" } else { "degraded" };
        Self {
            status: status.to_string(),
            rpc_connected: report.source.reachable,
            redis_connected: report.cache.reachable,
            postgres_connected: report.durable.reachable,
        }
    }
}
