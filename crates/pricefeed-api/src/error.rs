use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use pricefeed_storage::ErrorCategory;
use pricefeed_tiered::{ReadError, WriteError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    /// Set when the mutation was accepted upstream before the failure.
    #[serde(rename = "txHash", default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Too many requests: {0}")]
    TooManyRequests(String),
    #[error("Upstream failure: {message}")]
    BadGateway {
        message: String,
        tx_hash: Option<String>,
    },
    #[error("Timed out: {message}")]
    GatewayTimeout {
        message: String,
        tx_hash: Option<String>,
    },
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        Self::TooManyRequests(msg.into())
    }
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::BadGateway {
            message: msg.into(),
            tx_hash: None,
        }
    }
    pub fn gateway_timeout(msg: impl Into<String>) -> Self {
        Self::GatewayTimeout {
            message: msg.into(),
            tx_hash: None,
        }
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Attaches the reference of an already accepted mutation.
    #[must_use]
    pub fn with_tx_hash(mut self, hash: impl Into<String>) -> Self {
        if let Self::BadGateway { tx_hash, .. } | Self::GatewayTimeout { tx_hash, .. } = &mut self
        {
            *tx_hash = Some(hash.into());
        }
        self
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine readable code placed in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::TooManyRequests(_) => "rate_limited",
            ApiError::BadGateway { .. } => "upstream_unavailable",
            ApiError::GatewayTimeout { .. } => "timeout",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let (message, tx_hash) = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::TooManyRequests(msg)
            | ApiError::Internal(msg) => (msg.clone(), None),
            ApiError::BadGateway { message, tx_hash }
            | ApiError::GatewayTimeout { message, tx_hash } => (message.clone(), tx_hash.clone()),
        };
        ErrorBody {
            error: self.code().to_string(),
            message,
            tx_hash,
        }
    }
}

impl From<ReadError> for ApiError {
    fn from(err: ReadError) -> Self {
        if err.is_not_found() {
            return ApiError::not_found(err.to_string());
        }
        match &err {
            ReadError::InvalidRound(_) => ApiError::bad_request(err.to_string()),
            ReadError::Cancelled => ApiError::gateway_timeout(err.to_string()),
            ReadError::Unresolved { .. } => ApiError::internal(err.to_string()),
            ReadError::Retrieval { .. } => match err.category() {
                ErrorCategory::Internal => ApiError::internal(err.to_string()),
                _ => ApiError::bad_gateway(err.to_string()),
            },
        }
    }
}

impl From<WriteError> for ApiError {
    fn from(err: WriteError) -> Self {
        let mapped = match &err {
            WriteError::InvalidValue(_) | WriteError::UnsupportedValue(_) => {
                ApiError::bad_request(err.to_string())
            }
            WriteError::Unauthorized { .. } => ApiError::unauthorized(err.to_string()),
            _ if err.is_cancelled() => ApiError::gateway_timeout(err.to_string()),
            WriteError::AuthorizationCheck(_)
            | WriteError::Submission(_)
            | WriteError::Refresh { .. } => ApiError::bad_gateway(err.to_string()),
            WriteError::Cancelled => ApiError::gateway_timeout(err.to_string()),
        };
        match err.tx_reference() {
            Some(tx) => mapped.with_tx_hash(tx),
            None => mapped,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::to_vec(&self.to_body()).unwrap_or_else(|_| {
            br#"{"error":"internal","message":"Serialization failure"}"#.to_vec()
        });

        let mut response = Response::new(axum::body::Body::from(body));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}
