//! Authoritative source for Pricefeed: an aggregator-style price oracle
//! contract reached over Ethereum JSON-RPC.
//!
//! [`ContractOracle`] implements both `OracleReader` and `OracleWriter` from
//! `pricefeed-storage`. Reads are `eth_call`s against `latestRoundData()` and
//! `getRoundData(uint80)`; writes send `updateAnswer(int256)` either through
//! `eth_sendTransaction` from an account managed by the node, or, when a
//! `private_key` is configured, as a locally signed EIP-155 transaction via
//! `eth_sendRawTransaction`.
//!
//! # Example
//!
//! ```ignore
//! use pricefeed_chain::{ChainConfig, ContractOracle};
//! use pricefeed_storage::OracleReader;
//!
//! let oracle = ContractOracle::new(&ChainConfig {
//!     rpc_url: "http://localhost:8545".into(),
//!     contract_address: "0x5fbdb2315678afecb367f032d93f642f64180aa3".into(),
//!     signer_address: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".into(),
//!     ..Default::default()
//! })?;
//! let latest = oracle.latest().await?;
//! ```

pub mod abi;
mod config;
mod error;
mod oracle;
pub mod rpc;
mod signer;

pub use config::ChainConfig;
pub use error::{ChainError, Result};
pub use oracle::ContractOracle;
pub use rpc::RpcClient;
pub use signer::{LegacyTransaction, LocalSigner, SignedTransaction};
