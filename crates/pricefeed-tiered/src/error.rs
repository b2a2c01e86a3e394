//! Errors returned by the read and write coordinators.

use pricefeed_core::{CoreError, SignerIdentity};
use pricefeed_storage::{ErrorCategory, OracleError, RecordKey};

use crate::retry::RetryError;

/// Failure of a tiered read.
///
/// Cache and durable tier failures never appear here; they degrade to misses.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The caller supplied a malformed round identifier.
    #[error(transparent)]
    InvalidRound(#[from] CoreError),

    /// The request's cancellation token fired.
    #[error("read cancelled")]
    Cancelled,

    /// The authoritative source could not produce the record.
    #[error("failed to retrieve {key}: {source}")]
    Retrieval {
        key: RecordKey,
        #[source]
        source: RetryError<OracleError>,
    },

    /// Every tier reported a miss.
    #[error("no tier produced {key}")]
    Unresolved { key: RecordKey },
}

impl ReadError {
    pub(crate) fn from_source(key: RecordKey, err: RetryError<OracleError>) -> Self {
        match err {
            RetryError::Cancelled => Self::Cancelled,
            source => Self::Retrieval { key, source },
        }
    }

    /// Returns `true` if the source reported the requested round as unknown.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Retrieval { source, .. } => source
                .last_error()
                .is_some_and(OracleError::is_round_not_found),
            _ => false,
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRound(_) => ErrorCategory::Validation,
            Self::Cancelled => ErrorCategory::Infrastructure,
            Self::Unresolved { .. } => ErrorCategory::NotFound,
            Self::Retrieval { source, .. } => source
                .last_error()
                .map_or(ErrorCategory::Infrastructure, OracleError::category),
        }
    }
}

/// Failure of a write.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The submitted value is not an integer.
    #[error(transparent)]
    InvalidValue(#[from] CoreError),

    /// The value is an integer the source cannot represent.
    #[error("value rejected: {0}")]
    UnsupportedValue(#[source] OracleError),

    /// The authorized identity could not be determined.
    #[error("failed to determine the authorized writer: {0}")]
    AuthorizationCheck(#[source] OracleError),

    /// The configured signer is not the authorized writer.
    #[error("signer {signer} is not the authorized writer {authorized}")]
    Unauthorized {
        signer: SignerIdentity,
        authorized: SignerIdentity,
    },

    /// The mutation was not accepted by the source.
    #[error("failed to submit value: {0}")]
    Submission(#[source] RetryError<OracleError>),

    /// The mutation was accepted but the refreshed round could not be read.
    ///
    /// Cache and durable store were left untouched.
    #[error("value submitted in {tx_reference} but the new round could not be read back: {source}")]
    Refresh {
        tx_reference: String,
        #[source]
        source: RetryError<OracleError>,
    },

    /// The request's cancellation token fired before the mutation was accepted.
    #[error("write cancelled")]
    Cancelled,
}

impl WriteError {
    /// Transaction reference of an accepted mutation, if one was produced.
    #[must_use]
    pub fn tx_reference(&self) -> Option<&str> {
        match self {
            Self::Refresh { tx_reference, .. } => Some(tx_reference),
            _ => None,
        }
    }

    /// Returns `true` if the failure was caused by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Refresh { source, .. } | Self::Submission(source) => source.is_cancelled(),
            _ => false,
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidValue(_) | Self::UnsupportedValue(_) | Self::Unauthorized { .. } => {
                ErrorCategory::Validation
            }
            Self::AuthorizationCheck(_) | Self::Cancelled => ErrorCategory::Infrastructure,
            Self::Submission(source) | Self::Refresh { source, .. } => source
                .last_error()
                .map_or(ErrorCategory::Infrastructure, OracleError::category),
        }
    }
}
