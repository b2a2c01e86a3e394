//! The oracle contract as Pricefeed's authoritative source.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use pricefeed_core::{Answer, RoundRecord, SignerIdentity};
use pricefeed_storage::{OracleError, OracleReader, OracleWriter};
use tracing::{debug, info, warn};

use crate::abi::{self, RoundData};
use crate::config::ChainConfig;
use crate::error::{ChainError, Result};
use crate::rpc::RpcClient;
use crate::signer::{LegacyTransaction, LocalSigner};

/// How `updateAnswer` transactions are signed.
#[derive(Debug)]
enum Submission {
    /// The node holds the key (`eth_sendTransaction`).
    Node,
    /// We hold the key (`eth_sendRawTransaction`).
    Local(LocalSigner),
}

/// Reads rounds from, and submits answers to, one oracle contract.
#[derive(Debug)]
pub struct ContractOracle {
    rpc: RpcClient,
    contract: SignerIdentity,
    signer: SignerIdentity,
    submission: Submission,
    gas_limit: u64,
    chain_id: OnceLock<u64>,
}

impl ContractOracle {
    /// Creates a client from configuration. No network call is made.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC URL is empty, an address or the private
    /// key is malformed, or `signer_address` disagrees with the key.
    pub fn new(config: &ChainConfig) -> Result<Self> {
        let contract = SignerIdentity::parse(&config.contract_address)
            .map_err(|e| ChainError::config(format!("contract_address: {e}")))?;
        let (signer, submission) = signer_from_config(config)?;
        let rpc = RpcClient::new(&config.rpc_url, Duration::from_millis(config.timeout_ms))?;

        info!(
            rpc_url = %config.rpc_url,
            contract = %contract,
            signer = %signer,
            local_signing = matches!(submission, Submission::Local(_)),
            "Oracle contract client configured"
        );

        Ok(Self {
            rpc,
            contract,
            signer,
            submission,
            gas_limit: config.gas_limit,
            chain_id: OnceLock::new(),
        })
    }

    /// The account updates are sent from.
    pub fn signer(&self) -> &SignerIdentity {
        &self.signer
    }

    /// The contract address.
    pub fn contract(&self) -> &SignerIdentity {
        &self.contract
    }

    /// Chain id reported by the node. Cached after the first answer.
    pub async fn chain_id(&self) -> std::result::Result<u64, OracleError> {
        Ok(self.cached_chain_id().await?)
    }

    async fn cached_chain_id(&self) -> Result<u64> {
        if let Some(id) = self.chain_id.get() {
            return Ok(*id);
        }
        let id = self.rpc.chain_id().await?;
        Ok(*self.chain_id.get_or_init(|| id))
    }

    async fn send_signed(&self, key: &LocalSigner, data: Vec<u8>) -> Result<String> {
        let chain_id = self.cached_chain_id().await?;
        let nonce = self.rpc.transaction_count(self.signer.as_str()).await?;
        let gas_price = self.rpc.gas_price().await?;

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: self.gas_limit,
            to: address_bytes(&self.contract)?,
            value: 0,
            data,
            chain_id,
        };
        let signed = key.sign(&tx)?;
        debug!(nonce, gas_price, chain_id, tx_hash = %signed.hash, "Signed updateAnswer");

        let reported = self.rpc.send_raw_transaction(&signed.raw).await?;
        if !reported.eq_ignore_ascii_case(&signed.hash) {
            warn!(%reported, computed = %signed.hash, "Node reported a different transaction hash");
        }
        Ok(signed.hash)
    }

    async fn call(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.rpc.eth_call(self.contract.as_str(), data).await
    }

    async fn fetch_round(
        &self,
        data: &[u8],
        requested: Option<u64>,
    ) -> std::result::Result<RoundRecord, OracleError> {
        let raw = self.call(data).await?;
        let round = abi::decode_round_data(&raw)?;
        debug!(
            round_id = round.round_id,
            updated_at = round.updated_at,
            "Fetched round data"
        );
        to_record(round, requested)
    }
}

fn signer_from_config(config: &ChainConfig) -> Result<(SignerIdentity, Submission)> {
    let Some(raw_key) = config.private_key.as_deref() else {
        let signer = SignerIdentity::parse(&config.signer_address)
            .map_err(|e| ChainError::config(format!("signer_address: {e}")))?;
        return Ok((signer, Submission::Node));
    };

    let key = LocalSigner::from_hex(raw_key)?;
    let derived = key.address().clone();
    if !config.signer_address.trim().is_empty() {
        let configured = SignerIdentity::parse(&config.signer_address)
            .map_err(|e| ChainError::config(format!("signer_address: {e}")))?;
        if configured != derived {
            return Err(ChainError::config(format!(
                "signer_address {configured} does not match private_key (account {derived})"
            )));
        }
    }
    Ok((derived, Submission::Local(key)))
}

fn address_bytes(identity: &SignerIdentity) -> Result<[u8; 20]> {
    abi::decode_hex(identity.as_str())?
        .try_into()
        .map_err(|_| ChainError::decode(format!("{identity} is not a 20-byte address")))
}

fn to_record(
    round: RoundData,
    requested: Option<u64>,
) -> std::result::Result<RoundRecord, OracleError> {
    if round.updated_at == 0 {
        return Err(OracleError::RoundNotFound {
            round_id: requested.unwrap_or(round.round_id),
        });
    }

    let started_at = to_unix_seconds("startedAt", round.started_at)?;
    let updated_at = to_unix_seconds("updatedAt", round.updated_at)?;

    RoundRecord::new(
        round.round_id,
        Answer::from(round.answer),
        started_at,
        updated_at,
        round.answered_in_round,
    )
    .map_err(|e| OracleError::decode(e.to_string()))
}

fn to_unix_seconds(field: &str, value: u64) -> std::result::Result<i64, OracleError> {
    i64::try_from(value).map_err(|_| OracleError::decode(format!("{field} {value} out of range")))
}

#[async_trait]
impl OracleReader for ContractOracle {
    async fn latest(&self) -> std::result::Result<RoundRecord, OracleError> {
        let data = abi::encode_call(abi::LATEST_ROUND_DATA, &[]);
        self.fetch_round(&data, None).await
    }

    async fn by_round_id(&self, round_id: u64) -> std::result::Result<RoundRecord, OracleError> {
        let data = abi::encode_call(abi::GET_ROUND_DATA, &[abi::encode_uint(round_id)]);
        self.fetch_round(&data, Some(round_id)).await
    }
}

#[async_trait]
impl OracleWriter for ContractOracle {
    async fn current_authorized_identity(&self) -> std::result::Result<SignerIdentity, OracleError> {
        let data = abi::encode_call(abi::OWNER, &[]);
        let raw = self.call(&data).await?;
        let owner = abi::decode_address(&raw)?;
        Ok(SignerIdentity::from_bytes(owner))
    }

    fn check_value(&self, value: &Answer) -> std::result::Result<(), OracleError> {
        abi::encode_int256(value.as_bigint())?;
        Ok(())
    }

    async fn submit(&self, value: &Answer) -> std::result::Result<String, OracleError> {
        let word = abi::encode_int256(value.as_bigint())?;
        let data = abi::encode_call(abi::UPDATE_ANSWER, &[word]);

        let tx_hash = match &self.submission {
            Submission::Node => {
                self.rpc
                    .send_transaction(
                        self.signer.as_str(),
                        self.contract.as_str(),
                        &data,
                        self.gas_limit,
                    )
                    .await?
            }
            Submission::Local(key) => self.send_signed(key, data).await?,
        };

        info!(%tx_hash, answer = %value, "updateAnswer transaction sent");
        Ok(tx_hash)
    }
}
