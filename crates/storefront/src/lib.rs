//! Stride storefront library.
//!
//! Serves the pricing, checkout and payment webhook API over a
//! [`PricingStore`](store::PricingStore). The binary wires it to
//! `PostgreSQL`; tests run the same router over the in-memory store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::{
    Router,
    extract::State,
    http::{Request, Response, StatusCode},
    routing::get,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::state::AppState;

/// Build the full application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    let timeout = state.config().request_timeout;

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.store().backend_tag(), "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use chrono::{Duration as ChronoDuration, Utc};
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use stride_core::pricing::{PromoCode, PromoKind, ShippingZone};
    use stride_core::{PromoCodeId, ShippingZoneId};

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::store::{MemorySeed, MemoryStore, StoreOp};

    fn seed() -> MemorySeed {
        let now = Utc::now();
        MemorySeed {
            promo_codes: vec![PromoCode {
                id: PromoCodeId::generate(),
                code: "SAVE10".to_string(),
                description: None,
                kind: PromoKind::Percentage(Decimal::from(10)),
                min_order_amount: Decimal::ZERO,
                start_date: now - ChronoDuration::days(1),
                end_date: now + ChronoDuration::days(1),
                usage_limit: None,
                times_used: 0,
                is_active: true,
            }],
            shipping_zones: vec![ShippingZone {
                id: ShippingZoneId::generate(),
                name: "Metro Manila".to_string(),
                cities: vec!["manila".to_string(), "makati".to_string()],
                shipping_fee: Decimal::from(100),
                display_order: 1,
                is_active: true,
                is_default: false,
            }],
            ..MemorySeed::default()
        }
    }

    fn test_app(store: Arc<MemoryStore>) -> Router {
        let config = StorefrontConfig::new(
            SecretString::from("postgres://localhost/test"),
            "http://localhost:3000",
        );
        app(AppState::new(config, store).unwrap())
    }

    fn seeded_app() -> Router {
        test_app(Arc::new(MemoryStore::new(seed())))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn decimal(value: &Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = seeded_app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_readiness_follows_store() {
        let store = Arc::new(MemoryStore::new(MemorySeed::default()));
        let (status, _) = send(test_app(store.clone()), get("/health/ready")).await;
        assert_eq!(status, StatusCode::OK);

        store.set_failing(StoreOp::Ping, true).await;
        let (status, _) = send(test_app(store), get("/health/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_shipping_fee_without_city_is_default() {
        let (status, body) = send(seeded_app(), get("/api/shipping/fee")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decimal(&body["fee"]), Decimal::from(200));
    }

    #[tokio::test]
    async fn test_shipping_fee_matches_zone() {
        let (status, body) = send(seeded_app(), get("/api/shipping/fee?city=%20MAKATI%20")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decimal(&body["fee"]), Decimal::from(100));
        assert_eq!(body["zone_name"], "Metro Manila");
    }

    #[tokio::test]
    async fn test_validate_promo_requires_code() {
        let (status, body) = send(
            seeded_app(),
            post("/api/promo-codes/validate", &json!({"code": "  ", "subtotal": "100"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Promo code is required");
    }

    #[tokio::test]
    async fn test_validate_promo_is_case_insensitive() {
        let (status, body) = send(
            seeded_app(),
            post(
                "/api/promo-codes/validate",
                &json!({"code": "save10", "subtotal": "1000"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(decimal(&body["discount"]), Decimal::from(100));
    }

    #[tokio::test]
    async fn test_unknown_product_price_is_404() {
        let (status, body) = send(
            seeded_app(),
            get(&format!("/api/products/{}/price", uuid::Uuid::new_v4())),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Product not found");
    }

    #[tokio::test]
    async fn test_size_convert() {
        let (status, body) = send(seeded_app(), get("/api/sizes/convert?size=42&to=us_men")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["from"], "EU");
        assert_eq!(body["to"], "US_MEN");
        assert!(!body["result"].is_null());

        let (status, _) = send(seeded_app(), get("/api/sizes/convert?size=42&to=uk")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sale_banner_inactive_without_sale() {
        let (status, body) = send(seeded_app(), get("/api/sale-promotion")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], false);
    }

    #[tokio::test]
    async fn test_webhook_without_reference_is_rejected() {
        let (status, body) = send(
            seeded_app(),
            post("/webhooks/maya", &json!({"status": "PAYMENT_SUCCESS"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing orderId");
    }

    #[tokio::test]
    async fn test_webhook_for_unknown_order_is_404() {
        let (status, _) = send(
            seeded_app(),
            post(
                "/webhooks/maya",
                &json!({
                    "requestReferenceNumber": uuid::Uuid::new_v4().to_string(),
                    "status": "PAYMENT_SUCCESS",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_cart_quote_is_400() {
        let (status, _) = send(seeded_app(), post("/api/checkout/quote", &json!({"items": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
