use std::fmt;

/// The logical lookup key shared by all read tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// The record with the greatest round id.
    Latest,
    /// The record of one specific round.
    Round(u64),
}

impl RecordKey {
    /// Deterministic cache key: `latest` or `round:<id>`.
    pub fn cache_key(&self) -> String {
        match self {
            Self::Latest => "latest".to_string(),
            Self::Round(id) => format!("round:{id}"),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_are_deterministic() {
        assert_eq!(RecordKey::Latest.cache_key(), "latest");
        assert_eq!(RecordKey::Round(7).cache_key(), "round:7");
        assert_eq!(RecordKey::Round(7).to_string(), "round:7");
    }
}
