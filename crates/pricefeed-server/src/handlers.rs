use std::future::Future;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
};
use pricefeed_api::{
    ApiError, HealthResponse, RoundResponse, UpdatePriceRequest, UpdatePriceResponse,
};
use pricefeed_tiered::Resolved;
use tokio_util::sync::CancellationToken;

use crate::server::AppState;

/// Response header naming the tier that served a read.
pub const SERVED_BY_HEADER: &str = "x-served-by";

/// Runs `work` with a token that is cancelled when the request is dropped
/// or when `deadline` elapses, whichever comes first.
///
/// On deadline the work is not abandoned: it observes the cancellation and
/// returns its own error.
pub async fn within_deadline<F, Fut, T>(deadline: Duration, work: F) -> T
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = T>,
{
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let work = work(token.clone());
    tokio::pin!(work);

    tokio::select! {
        out = &mut work => out,
        () = tokio::time::sleep(deadline) => {
            tracing::warn!(deadline_ms = %deadline.as_millis(), "request deadline elapsed");
            token.cancel();
            work.await
        }
    }
}

fn round_response(resolved: Resolved) -> impl IntoResponse {
    let served_by = HeaderValue::from_static(resolved.tier.as_str());
    (
        StatusCode::OK,
        [(HeaderName::from_static(SERVED_BY_HEADER), served_by)],
        Json(RoundResponse::from(&resolved.record)),
    )
}

pub async fn latest_price(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let deadline = state.request_timeout;
    let resolved = within_deadline(deadline, |cancel| async move {
        state.reader.latest(&cancel).await
    })
    .await?;
    Ok(round_response(resolved))
}

pub async fn round_by_id(
    State(state): State<AppState>,
    Path(round_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deadline = state.request_timeout;
    let resolved = within_deadline(deadline, |cancel| async move {
        state.reader.by_round_id(&round_id, &cancel).await
    })
    .await?;
    Ok(round_response(resolved))
}

pub async fn update_price(
    State(state): State<AppState>,
    payload: Result<Json<UpdatePriceRequest>, JsonRejection>,
) -> Result<Json<UpdatePriceResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let deadline = state.request_timeout;
    let receipt = within_deadline(deadline, |cancel| async move {
        state.writer.submit(&request.new_answer, &cancel).await
    })
    .await?;

    tracing::info!(
        tx_hash = %receipt.tx_reference,
        round_id = receipt.record.round_id,
        "price updated"
    );
    Ok(Json(UpdatePriceResponse::from(&receipt)))
}

/// Always 200; unreachable tiers are reported in the body.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let deadline = state.request_timeout;
    let report = within_deadline(deadline, |cancel| async move {
        state.prober.probe(&cancel).await
    })
    .await;
    (StatusCode::OK, Json(HealthResponse::from(&report)))
}
