//! Error types for the oracle contract client.

use pricefeed_storage::OracleError;

/// Errors raised while talking to the node or decoding its answers.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The HTTP request failed or timed out.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The node answered with a non-success HTTP status.
    #[error("Node returned HTTP {status}")]
    Status { status: u16 },

    /// The node answered with a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A value cannot be ABI-encoded.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A transaction could not be signed locally.
    #[error("Signing error: {0}")]
    Signing(String),

    /// The client is misconfigured.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChainError {
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    #[must_use]
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<ChainError> for OracleError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Http(e) => OracleError::transport(e.to_string()),
            err @ ChainError::Status { .. } => OracleError::transport(err.to_string()),
            ChainError::Rpc { code, message } => OracleError::rpc(code, message),
            ChainError::Decode(message) => OracleError::decode(message),
            ChainError::InvalidValue(message) => OracleError::invalid_value(message),
            ChainError::Signing(message) | ChainError::Config(message) => {
                OracleError::transport(message)
            }
        }
    }
}

/// Result type alias for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_oracle_error() {
        let err: OracleError = ChainError::Rpc {
            code: -32000,
            message: "execution reverted".into(),
        }
        .into();
        assert!(matches!(err, OracleError::Rpc { code: -32000, .. }));

        let err: OracleError = ChainError::Status { status: 503 }.into();
        assert!(matches!(err, OracleError::Transport { .. }));

        let err: OracleError = ChainError::invalid_value("too wide").into();
        assert!(matches!(err, OracleError::InvalidValue { .. }));
    }
}
