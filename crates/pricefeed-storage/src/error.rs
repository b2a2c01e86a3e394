//! Error types for the tier abstraction layer.

use std::fmt;

/// Errors raised by the cache and durable tiers.
///
/// The read coordinator treats every one of these as a soft failure: it is
/// logged and the next tier is consulted.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to reach the backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// A stored entry could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the encoding failure.
        message: String,
    },

    /// The record cannot be represented by this backend.
    #[error("Invalid record: {message}")]
    InvalidRecord {
        /// Description of why the record was refused.
        message: String,
    },

    /// An internal backend error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRecord` error.
    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Serialization { .. } | Self::InvalidRecord { .. } => ErrorCategory::Validation,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Errors raised by the authoritative source.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The transport to the source failed (connect, timeout, bad status).
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The source answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The source answered with data that could not be decoded.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the malformed payload.
        message: String,
    },

    /// The requested round has never been answered.
    #[error("Round not found: {round_id}")]
    RoundNotFound {
        /// The round that was requested.
        round_id: u64,
    },

    /// The value cannot be submitted to the source.
    #[error("Invalid value: {message}")]
    InvalidValue {
        /// Description of why the value was refused.
        message: String,
    },
}

impl OracleError {
    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new `Rpc` error.
    #[must_use]
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    /// Returns `true` if the source reported the round as unknown.
    #[must_use]
    pub fn is_round_not_found(&self) -> bool {
        matches!(self, Self::RoundNotFound { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { .. } | Self::Rpc { .. } => ErrorCategory::Infrastructure,
            Self::Decode { .. } => ErrorCategory::Internal,
            Self::RoundNotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidValue { .. } => ErrorCategory::Validation,
        }
    }
}

/// Categories of tier errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Requested data does not exist.
    NotFound,
    /// Malformed input or stored data.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
