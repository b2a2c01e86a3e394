//! Minimal ABI encoding for the oracle contract.
//!
//! Only static types appear in the calls we make, so every argument and
//! return value is a single 32-byte big-endian word.

use num_bigint::{BigInt, Sign};

use crate::error::{ChainError, Result};

/// Size of one ABI word.
pub const WORD: usize = 32;

/// `latestRoundData()`
pub const LATEST_ROUND_DATA: [u8; 4] = [0xfe, 0xaf, 0x96, 0x8c];
/// `getRoundData(uint80)`
pub const GET_ROUND_DATA: [u8; 4] = [0x9a, 0x6f, 0xc8, 0xf5];
/// `owner()`
pub const OWNER: [u8; 4] = [0x8d, 0xa5, 0xcb, 0x5b];
/// `updateAnswer(int256)`
pub const UPDATE_ANSWER: [u8; 4] = [0xa8, 0x7a, 0x20, 0xce];

/// Decoded `(uint80, int256, uint256, uint256, uint80)` round tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundData {
    pub round_id: u64,
    pub answer: BigInt,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u64,
}

/// Concatenates a selector with its encoded arguments.
pub fn encode_call(selector: [u8; 4], args: &[[u8; WORD]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD);
    data.extend_from_slice(&selector);
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// Encodes an unsigned integer (`uint80`, `uint256`).
pub fn encode_uint(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encodes an `int256` in two's complement.
///
/// # Errors
///
/// Returns [`ChainError::InvalidValue`] if `value` is outside
/// `[-2^255, 2^255 - 1]`.
pub fn encode_int256(value: &BigInt) -> Result<[u8; WORD]> {
    let bytes = value.to_signed_bytes_be();
    if bytes.len() > WORD {
        return Err(ChainError::invalid_value(format!(
            "{value} does not fit in int256"
        )));
    }

    let fill = if value.sign() == Sign::Minus { 0xff } else { 0x00 };
    let mut word = [fill; WORD];
    word[WORD - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

/// Decodes an `int256` word.
pub fn decode_int256(word: &[u8]) -> BigInt {
    BigInt::from_signed_bytes_be(word)
}

/// Decodes an unsigned word that must fit in 64 bits.
pub fn decode_u64(word: &[u8], field: &str) -> Result<u64> {
    let (high, low) = word.split_at(WORD - 8);
    if high.iter().any(|b| *b != 0) {
        return Err(ChainError::decode(format!("{field} exceeds 64 bits")));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    Ok(u64::from_be_bytes(buf))
}

/// Decodes the return data of `latestRoundData()` / `getRoundData(uint80)`.
pub fn decode_round_data(data: &[u8]) -> Result<RoundData> {
    if data.len() < 5 * WORD {
        return Err(ChainError::decode(format!(
            "round data must be {} bytes, got {}",
            5 * WORD,
            data.len()
        )));
    }

    let word = |index: usize| &data[index * WORD..(index + 1) * WORD];

    Ok(RoundData {
        round_id: decode_u64(word(0), "roundId")?,
        answer: decode_int256(word(1)),
        started_at: decode_u64(word(2), "startedAt")?,
        updated_at: decode_u64(word(3), "updatedAt")?,
        answered_in_round: decode_u64(word(4), "answeredInRound")?,
    })
}

/// Decodes an `address` return value into its 20 bytes.
pub fn decode_address(data: &[u8]) -> Result<[u8; 20]> {
    if data.len() < WORD {
        return Err(ChainError::decode(format!(
            "address must be {WORD} bytes, got {}",
            data.len()
        )));
    }
    if data[..12].iter().any(|b| *b != 0) {
        return Err(ChainError::decode("address word has non-zero padding"));
    }
    let mut address = [0u8; 20];
    address.copy_from_slice(&data[12..WORD]);
    Ok(address)
}

/// Parses `0x`-prefixed hex returned by the node.
pub fn decode_hex(raw: &str) -> Result<Vec<u8>> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::decode(format!("expected 0x-prefixed hex, got {raw:?}")))?;
    hex::decode(digits).map_err(|e| ChainError::decode(format!("invalid hex: {e}")))
}

/// Formats bytes as `0x`-prefixed hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
