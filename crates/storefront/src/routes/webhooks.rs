//! Maya payment webhook.
//!
//! Maya posts the checkout outcome with our order id in
//! `requestReferenceNumber`. The payload is not signed; the order is only
//! moved between statuses and never re-priced.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use stride_core::{GatewayOutcome, OrderId, PaymentStatus};

use crate::error::{AppError, Result};
use crate::middleware::RequestId;
use crate::models::PaymentUpdate;
use crate::state::AppState;

/// The fields of Maya's webhook payload we use.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MayaWebhook {
    /// Maya's checkout id.
    pub id: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub request_reference_number: Option<String>,
    pub receipt: Option<serde_json::Value>,
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Apply a payment outcome to its order.
#[instrument(skip_all, fields(request_id = %request_id.as_str()))]
pub async fn maya(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(payload): Json<MayaWebhook>,
) -> Result<Response> {
    let Some(reference) = payload
        .request_reference_number
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
    else {
        warn!("Maya webhook without requestReferenceNumber");
        return Ok(bad_request("Missing orderId"));
    };
    let Ok(order_id) = reference.parse::<OrderId>() else {
        warn!(reference, "Maya webhook with malformed order id");
        return Ok(bad_request("Invalid orderId"));
    };

    let outcome = GatewayOutcome::from_gateway(
        payload.status.as_deref(),
        payload.payment_status.as_deref(),
    );
    let update = PaymentUpdate::from_outcome(outcome, payload.id, payload.receipt);
    let reports_payment = update.payment_status == Some(PaymentStatus::Paid);

    let order = state
        .store()
        .update_order_payment(order_id, update)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    if order.payment_status == PaymentStatus::Paid && !reports_payment {
        info!(order_id = %order.id, ?outcome, "Order already paid, webhook ignored");
    }

    info!(
        order_id = %order.id,
        status = %order.status,
        payment_status = %order.payment_status,
        "Order payment updated from webhook"
    );

    Ok(Json(json!({
        "success": true,
        "message": "Webhook processed successfully",
    }))
    .into_response())
}
