//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (store reachable)
//!
//! # Pricing
//! GET  /api/products/{id}/price         - Resolved price with savings
//! POST /api/promo-codes/validate        - Check a promo code against a subtotal
//! GET  /api/shipping/fee?city=          - Shipping fee for a city
//! GET  /api/sale-promotion              - Running sale banner and countdown
//!
//! # Sizes
//! GET  /api/sizes                       - Conversion table
//! GET  /api/sizes/convert?size=&from=&to= - Convert between scales
//!
//! # Checkout
//! POST /api/checkout/quote              - Price a cart
//! POST /api/checkout                    - Place an order (idempotent by reference)
//! GET  /api/orders/{id}                 - Order summary
//!
//! # Webhooks
//! POST /webhooks/maya                   - Payment outcome from Maya
//! ```

pub mod checkout;
pub mod pricing;
pub mod sizes;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products/{id}/price", get(pricing::product_price))
        .route("/promo-codes/validate", post(pricing::validate_promo))
        .route("/shipping/fee", get(pricing::shipping_fee))
        .route("/sale-promotion", get(pricing::sale_promotion))
        .route("/sizes", get(sizes::table))
        .route("/sizes/convert", get(sizes::convert))
        .route("/checkout/quote", post(checkout::quote))
        .route("/checkout", post(checkout::place_order))
        .route("/orders/{id}", get(checkout::order))
}

/// Create the gateway webhook router.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/maya", post(webhooks::maya))
}

/// Create all storefront routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api", api_routes())
        .nest("/webhooks", webhook_routes())
}
