//! Cart quote, checkout and order lookup handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::instrument;

use stride_core::OrderId;

use crate::error::{AppError, Result};
use crate::models::Order;
use crate::services::{CheckoutOutcome, CheckoutRequest, Quote, QuoteRequest};
use crate::state::AppState;

/// Price a cart without placing an order.
#[instrument(skip(state, request))]
pub async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>> {
    Ok(Json(state.pricing().quote(&request, Utc::now()).await?))
}

/// Place an order.
///
/// Returns 201 for a new order and 200 when the reference was already used.
#[instrument(skip(state, request))]
pub async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutOutcome>)> {
    let outcome = state.checkout().place_order(request).await?;
    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

/// Order summary for the confirmation page.
#[instrument(skip(state))]
pub async fn order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    state
        .store()
        .order(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
}
