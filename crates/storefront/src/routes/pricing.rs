//! Price, promo, shipping and sale banner handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stride_core::ProductId;
use stride_core::catalog::sale_percentage;
use stride_core::pricing::{ResolvedPrice, ShippingQuote};

use crate::error::{AppError, Result};
use crate::services::{PromoValidation, SaleBanner};
use crate::state::AppState;

/// Price of one product with badge data.
#[derive(Debug, Serialize)]
pub struct ProductPriceResponse {
    #[serde(flatten)]
    pub price: ResolvedPrice,
    pub savings: Decimal,
    /// Whole percent off the list price, 0 when not reduced.
    pub percent_off: u32,
}

/// Resolved price for a product at the current time.
#[instrument(skip(state))]
pub async fn product_price(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductPriceResponse>> {
    let price = state
        .pricing()
        .product_price(id, Utc::now())
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    Ok(Json(ProductPriceResponse {
        savings: price.savings(),
        percent_off: sale_percentage(price.list_price, Some(price.unit_price)),
        price,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValidatePromoRequest {
    pub code: String,
    pub subtotal: Decimal,
}

/// Check a promo code against a cart subtotal without using it.
#[instrument(skip(state, body), fields(code = %body.code))]
pub async fn validate_promo(
    State(state): State<AppState>,
    Json(body): Json<ValidatePromoRequest>,
) -> Result<Json<PromoValidation>> {
    if body.code.trim().is_empty() {
        return Err(AppError::BadRequest("Promo code is required".to_string()));
    }
    if body.subtotal.is_sign_negative() {
        return Err(AppError::BadRequest(
            "Subtotal cannot be negative".to_string(),
        ));
    }

    Ok(Json(
        state
            .pricing()
            .validate_promo(&body.code, body.subtotal, Utc::now())
            .await,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ShippingFeeQuery {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub free_shipping: bool,
}

/// Shipping fee for a city.
#[instrument(skip(state))]
pub async fn shipping_fee(
    State(state): State<AppState>,
    Query(query): Query<ShippingFeeQuery>,
) -> Json<ShippingQuote> {
    Json(
        state
            .pricing()
            .shipping_fee(&query.city, query.free_shipping)
            .await,
    )
}

#[derive(Debug, Serialize)]
pub struct SaleBannerResponse {
    pub active: bool,
    #[serde(flatten)]
    pub banner: Option<SaleBanner>,
}

/// The running sale, if any, with its countdown.
pub async fn sale_promotion(State(state): State<AppState>) -> Json<SaleBannerResponse> {
    let banner = state.pricing().sale_banner(Utc::now()).await;
    Json(SaleBannerResponse {
        active: banner.is_some(),
        banner,
    })
}
