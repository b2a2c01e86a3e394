//! Arbitrary-precision oracle answers.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// An oracle answer: a signed integer of unbounded width.
///
/// The authoritative source may emit values wider than 64 bits, so the value
/// is held as a [`BigInt`] and crosses every boundary as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Answer(BigInt);

impl Answer {
    /// Parse a caller-supplied decimal string.
    ///
    /// Accepts an optional leading sign followed by ASCII digits and nothing
    /// else; padded input such as `" 12 "` is rejected. Blank input is
    /// reported as empty.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.trim().is_empty() {
            return Err(CoreError::EmptyAnswer);
        }

        let digits = raw
            .strip_prefix('-')
            .or_else(|| raw.strip_prefix('+'))
            .unwrap_or(raw);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::invalid_answer(raw));
        }

        BigInt::from_str(raw)
            .map(Self)
            .map_err(|_| CoreError::invalid_answer(raw))
    }

    /// Borrow the underlying integer.
    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    /// Consume into the underlying integer.
    pub fn into_bigint(self) -> BigInt {
        self.0
    }
}

impl From<BigInt> for Answer {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

impl From<i64> for Answer {
    fn from(value: i64) -> Self {
        Self(BigInt::from(value))
    }
}

impl FromStr for Answer {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Answer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Answer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Answer::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_signed_values() {
        assert_eq!(Answer::parse("12345").unwrap().to_string(), "12345");
        assert_eq!(Answer::parse("-42").unwrap().to_string(), "-42");
        assert_eq!(Answer::parse("+7").unwrap().to_string(), "7");
        assert_eq!(Answer::parse("0099").unwrap().to_string(), "99");
    }

    #[test]
    fn keeps_values_wider_than_64_bits() {
        let wide = "340282366920938463463374607431768211457";
        assert_eq!(Answer::parse(wide).unwrap().to_string(), wide);
    }

    #[test]
    fn rejects_empty_and_malformed_input() {
        assert_eq!(Answer::parse(""), Err(CoreError::EmptyAnswer));
        assert_eq!(Answer::parse("   "), Err(CoreError::EmptyAnswer));
        for raw in ["-", "12a", "1.5", "0x10", "1_000", "--1", "1e9", " 12 ", "12\n", "- 1"] {
            assert!(
                matches!(Answer::parse(raw), Err(CoreError::InvalidAnswer(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn serializes_as_decimal_string() {
        let answer = Answer::parse("-18446744073709551617").unwrap();
        let json = serde_json::to_string(&answer).unwrap();
        assert_eq!(json, "\"-18446744073709551617\"");

        let back: Answer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, answer);

        assert!(serde_json::from_str::<Answer>("\"abc\"").is_err());
    }
}
