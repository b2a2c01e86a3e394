//! JSON-RPC 2.0 transport to an Ethereum node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::abi;
use crate::error::{ChainError, Result};

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// A JSON-RPC client bound to a single node URL.
///
/// Cheap to share: the underlying `reqwest::Client` pools connections.
#[derive(Debug)]
pub struct RpcClient {
    http_client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ChainError::config("RPC URL must not be empty"));
        }

        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    /// The node URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs one JSON-RPC call and deserializes its `result`.
    pub async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!(id, method, "Sending JSON-RPC request");

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(method, error = %e, "JSON-RPC request failed");
                ChainError::Http(e)
            })?;

        if !response.status().is_success() {
            return Err(ChainError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::decode(format!("malformed JSON-RPC response: {e}")))?;

        if let Some(error) = body.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = body
            .result
            .ok_or_else(|| ChainError::decode(format!("{method} response has no result")))?;

        serde_json::from_value(result)
            .map_err(|e| ChainError::decode(format!("unexpected {method} result: {e}")))
    }

    /// `eth_call` against the latest block; returns the raw return data.
    pub async fn eth_call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>> {
        let params = json!([{ "to": to, "data": abi::encode_hex(data) }, "latest"]);
        let raw: String = self.call("eth_call", params).await?;
        abi::decode_hex(&raw)
    }

    /// `eth_sendTransaction` from a node-managed account; returns the tx hash.
    pub async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        data: &[u8],
        gas: u64,
    ) -> Result<String> {
        let params = json!([{
            "from": from,
            "to": to,
            "data": abi::encode_hex(data),
            "gas": format!("{gas:#x}"),
        }]);
        let tx_hash: String = self.call("eth_sendTransaction", params).await?;
        check_tx_hash(tx_hash)
    }

    /// `eth_sendRawTransaction` with an already signed payload; returns the
    /// tx hash reported by the node.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String> {
        let tx_hash: String = self
            .call("eth_sendRawTransaction", json!([abi::encode_hex(raw)]))
            .await?;
        check_tx_hash(tx_hash)
    }

    /// `eth_getTransactionCount` at the pending block, so transactions still
    /// in the pool are counted.
    pub async fn transaction_count(&self, address: &str) -> Result<u64> {
        let raw: String = self
            .call("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        let count = parse_quantity(&raw, "nonce")?;
        u64::try_from(count).map_err(|_| ChainError::decode(format!("nonce {raw} exceeds 64 bits")))
    }

    /// `eth_gasPrice`, in wei.
    pub async fn gas_price(&self) -> Result<u128> {
        let raw: String = self.call("eth_gasPrice", json!([])).await?;
        parse_quantity(&raw, "gas price")
    }

    /// `eth_chainId`.
    pub async fn chain_id(&self) -> Result<u64> {
        let raw: String = self.call("eth_chainId", json!([])).await?;
        let id = parse_quantity(&raw, "chain id")?;
        u64::try_from(id).map_err(|_| ChainError::decode(format!("chain id {raw} exceeds 64 bits")))
    }
}

fn check_tx_hash(tx_hash: String) -> Result<String> {
    if !tx_hash.starts_with("0x") || tx_hash.len() != 66 {
        return Err(ChainError::decode(format!(
            "unexpected transaction hash {tx_hash:?}"
        )));
    }
    Ok(tx_hash)
}

/// Parses a JSON-RPC hex quantity such as `0x1a`.
fn parse_quantity(raw: &str, what: &str) -> Result<u128> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::decode(format!("{what} {raw:?} is not hex")))?;
    u128::from_str_radix(digits, 16).map_err(|e| ChainError::decode(format!("{what} {raw:?}: {e}")))
}
