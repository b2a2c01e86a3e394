//! Local signing of legacy (EIP-155) transactions.
//!
//! Used when the node does not manage the submitting account. The signed
//! payload is broadcast with `eth_sendRawTransaction`.

use std::fmt;

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use pricefeed_core::SignerIdentity;
use sha3::{Digest, Keccak256};

use crate::error::{ChainError, Result};

/// An unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: [u8; 20],
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// RLP encoding of the signed transaction.
    pub raw: Vec<u8>,
    /// `0x`-prefixed keccak-256 of `raw`.
    pub hash: String,
}

/// A secp256k1 key held in memory.
pub struct LocalSigner {
    key: SigningKey,
    address: SignerIdentity,
}

impl LocalSigner {
    /// Parses a hex private key, with or without a `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Config`] if the key is not 32 bytes of hex or
    /// is not a valid secp256k1 scalar. The key itself never appears in
    /// the error.
    pub fn from_hex(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| ChainError::config("private_key must be 32 bytes of hex"))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| ChainError::config("private_key is not a valid secp256k1 key"))?;

        let address = address_of(&key);
        Ok(Self { key, address })
    }

    /// The account this key controls.
    pub fn address(&self) -> &SignerIdentity {
        &self.address
    }

    /// Signs `tx` with replay protection for `tx.chain_id`.
    pub fn sign(&self, tx: &LegacyTransaction) -> Result<SignedTransaction> {
        let chain_id = rlp::uint(u128::from(tx.chain_id));
        let mut fields = tx.unsigned_fields();
        fields.extend([chain_id, rlp::uint(0), rlp::uint(0)]);
        let digest = keccak256(&rlp::list(&fields));

        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| ChainError::Signing(e.to_string()))?;

        let v = u128::from(recovery_id.to_byte()) + u128::from(tx.chain_id) * 2 + 35;
        let (r, s) = signature.split_bytes();

        let mut fields = tx.unsigned_fields();
        fields.extend([
            rlp::uint(v),
            rlp::bytes(strip_leading_zeros(&r)),
            rlp::bytes(strip_leading_zeros(&s)),
        ]);
        let raw = rlp::list(&fields);
        let hash = format!("0x{}", hex::encode(keccak256(&raw)));

        Ok(SignedTransaction { raw, hash })
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LegacyTransaction {
    fn unsigned_fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp::uint(u128::from(self.nonce)),
            rlp::uint(self.gas_price),
            rlp::uint(u128::from(self.gas_limit)),
            rlp::bytes(&self.to),
            rlp::uint(self.value),
            rlp::bytes(&self.data),
        ]
    }
}

/// Last 20 bytes of the keccak-256 of the uncompressed public key.
fn address_of(key: &SigningKey) -> SignerIdentity {
    let point = key.verifying_key().as_affine().to_encoded_point(false);
    // Skip the 0x04 SEC1 tag.
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    SignerIdentity::from_bytes(address)
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Recursive length prefix encoding, limited to what legacy transactions use.
mod rlp {
    use super::strip_leading_zeros;

    pub fn uint(value: u128) -> Vec<u8> {
        bytes(strip_leading_zeros(&value.to_be_bytes()))
    }

    pub fn bytes(data: &[u8]) -> Vec<u8> {
        if data.len() == 1 && data[0] < 0x80 {
            return data.to_vec();
        }
        let mut out = header(0x80, data.len());
        out.extend_from_slice(data);
        out
    }

    pub fn list(items: &[Vec<u8>]) -> Vec<u8> {
        let payload_len = items.iter().map(Vec::len).sum();
        let mut out = header(0xc0, payload_len);
        for item in items {
            out.extend_from_slice(item);
        }
        out
    }

    fn header(offset: u8, len: usize) -> Vec<u8> {
        if len <= 55 {
            // len fits in a u8 here
            return vec![offset + len as u8];
        }
        let len_bytes = strip_leading_zeros(&len.to_be_bytes()).to_vec();
        let mut out = Vec::with_capacity(1 + len_bytes.len());
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend(len_bytes);
        out
    }

}
