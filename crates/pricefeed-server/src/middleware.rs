use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request, header::AUTHORIZATION, header::RETRY_AFTER},
    middleware::Next,
    response::Response,
};
use governor::{Quota, RateLimiter, clock::DefaultClock};
use pricefeed_api::ApiError;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Process-wide rate limiter.
pub type DirectRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>;

// =============================================================================
// Request ID
// =============================================================================

/// Preserves an incoming `x-request-id` or generates one, and echoes it on the
/// response.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let req_id_value = req.headers().get(&header_name).cloned().unwrap_or_else(|| {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
    });

    // Visible to the access-log span and handlers
    req.headers_mut()
        .insert(header_name.clone(), req_id_value.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id_value);
    res
}

// =============================================================================
// API Key Authentication
// =============================================================================

/// Rejects requests that do not present the configured API key.
///
/// The key is accepted from `x-api-key` or from `Authorization: Bearer`.
pub async fn api_key(
    State(expected): State<Arc<str>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if should_skip_authentication(&req) {
        return next.run(req).await;
    }

    let verdict = presented_key(req.headers()).map(|key| keys_match(key, &expected));
    match verdict {
        Some(true) => next.run(req).await,
        Some(false) => {
            tracing::debug!(path = %req.uri().path(), "Invalid API key");
            ApiError::unauthorized("Invalid API key").into_response()
        }
        None => {
            tracing::debug!(path = %req.uri().path(), "No API key presented");
            ApiError::unauthorized("API key required").into_response()
        }
    }
}

fn should_skip_authentication(req: &Request<Body>) -> bool {
    req.uri().path() == "/health"
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|h| h.to_str().ok()) {
        return Some(key);
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

// Length leaks, content does not.
fn keys_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

// =============================================================================
// Rate Limiting
// =============================================================================

pub fn rate_limiter(per_second: NonZeroU32) -> Arc<DirectRateLimiter> {
    Arc::new(RateLimiter::direct(Quota::per_second(per_second)))
}

/// Answers 429 with `Retry-After` once the global budget is spent.
pub async fn rate_limit(
    State(limiter): State<Arc<DirectRateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match limiter.check() {
        Ok(()) => next.run(req).await,
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(governor::clock::Clock::now(&DefaultClock::default()))
                .as_secs()
                .max(1);
            tracing::warn!(path = %req.uri().path(), retry_after, "Rate limit exceeded");

            let mut response = ApiError::too_many_requests("Rate limit exceeded").into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}
