//! Configuration for the oracle contract client.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection and signing settings for [`ContractOracle`](crate::ContractOracle).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint, e.g. `http://localhost:8545`.
    pub rpc_url: String,

    /// Address of the oracle contract.
    pub contract_address: String,

    /// Account that submits updates. Without `private_key` it must be
    /// unlocked on the node; with one it may be left empty.
    pub signer_address: String,

    /// Hex secp256k1 key. When set, transactions are signed locally and
    /// broadcast with `eth_sendRawTransaction`.
    #[serde(skip_serializing)]
    pub private_key: Option<String>,

    /// Gas limit attached to `updateAnswer` transactions.
    pub gas_limit: u64,

    /// Per-request HTTP timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".into(),
            contract_address: String::new(),
            signer_address: String::new(),
            private_key: None,
            gas_limit: 300_000,
            timeout_ms: 10_000,
        }
    }
}

impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("signer_address", &self.signer_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "***"))
            .field("gas_limit", &self.gas_limit)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}
