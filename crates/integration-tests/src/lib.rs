//! Integration test harness for the Stride storefront.
//!
//! Each test spawns the real router on `127.0.0.1:0` over an in-memory store
//! and talks to it with `reqwest`. Card payments go to a mock Maya server
//! spawned the same way.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stride-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use stride_core::catalog::Product;
use stride_core::pricing::{
    Discount, DiscountKind, DiscountScope, PromoCode, PromoKind, SalePromotion, ShippingZone,
};
use stride_core::size::Size;
use stride_core::{
    CategoryId, DiscountId, ProductId, PromoCodeId, SalePromotionId, ShippingZoneId,
};
use stride_storefront::config::{MayaConfig, StorefrontConfig};
use stride_storefront::state::AppState;
use stride_storefront::store::{MemorySeed, MemoryStore};

/// Serve a router on an ephemeral local port and return its base URL.
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// A running storefront over an in-memory store.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub client: Client,
}

impl TestServer {
    /// Spawn a storefront without Maya.
    pub async fn spawn(seed: MemorySeed) -> Self {
        Self::spawn_with(seed, None).await
    }

    /// Spawn a storefront whose Maya client points at `maya`.
    pub async fn spawn_with(seed: MemorySeed, maya: Option<&MockMaya>) -> Self {
        let mut config = StorefrontConfig::new(
            SecretString::from("postgres://localhost/unused"),
            "http://shop.test",
        );
        config.maya = maya.map(|mock| MayaConfig {
            api_base: mock.base_url.clone(),
            public_key: "pk-test".to_string(),
            secret_key: SecretString::from("sk-test"),
            payment_link: Some("https://paymaya.me/stride".to_string()),
        });

        let store = Arc::new(MemoryStore::new(seed));
        let state = AppState::new(config, store.clone()).expect("Failed to build app state");
        let base_url = serve(stride_storefront::app(state)).await;

        Self {
            base_url,
            store,
            client: Client::new(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a JSON body and return the status and JSON response.
    pub async fn post(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Request failed");
        read(response).await
    }

    /// GET a path and return the status and JSON response.
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed");
        read(response).await
    }
}

async fn read(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

// =============================================================================
// Mock Maya
// =============================================================================

/// How the mock Checkout API answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MayaMode {
    /// Create a checkout session.
    Accept,
    /// Reject with `K004`, as for merchants without the Checkout API.
    EndpointUnavailable,
}

struct MockState {
    mode: MayaMode,
    calls: AtomicUsize,
    last_request: tokio::sync::Mutex<Option<Value>>,
}

/// A stand-in for Maya's Checkout API.
pub struct MockMaya {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockMaya {
    pub async fn spawn(mode: MayaMode) -> Self {
        let state = Arc::new(MockState {
            mode,
            calls: AtomicUsize::new(0),
            last_request: tokio::sync::Mutex::new(None),
        });
        let app = Router::new()
            .route("/checkout/v1/checkouts", post(create_checkout))
            .with_state(state.clone());

        Self {
            base_url: serve(app).await,
            state,
        }
    }

    /// Number of checkout requests received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Body of the most recent checkout request.
    pub async fn last_request(&self) -> Option<Value> {
        self.state.last_request.lock().await.clone()
    }
}

async fn create_checkout(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let n = state.calls.fetch_add(1, Ordering::SeqCst) + 1;
    *state.last_request.lock().await = Some(body);

    match state.mode {
        MayaMode::Accept => (
            StatusCode::OK,
            Json(json!({
                "checkoutId": format!("chk-{n}"),
                "redirectUrl": format!("https://payments.maya.test/checkout?id=chk-{n}"),
            })),
        ),
        MayaMode::EndpointUnavailable => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "code": "K004",
                "error": "Invalid endpoint for merchant",
            })),
        ),
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Seed data with known ids.
pub struct Catalog {
    pub seed: MemorySeed,
    /// "Street Low": 1000, 20% off through its category, EU 42 in stock, 43 sold out.
    pub sneaker: ProductId,
    /// "Trail Runner": 2500, no discount.
    pub runner: ProductId,
}

fn promo(code: &str, kind: PromoKind, now: DateTime<Utc>) -> PromoCode {
    PromoCode {
        id: PromoCodeId::generate(),
        code: code.to_string(),
        description: None,
        kind,
        min_order_amount: Decimal::ZERO,
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(7),
        usage_limit: None,
        times_used: 0,
        is_active: true,
    }
}

fn zone(name: &str, cities: &[&str], fee: i64, display_order: i32) -> ShippingZone {
    ShippingZone {
        id: ShippingZoneId::generate(),
        name: name.to_string(),
        cities: cities.iter().map(ToString::to_string).collect(),
        shipping_fee: Decimal::from(fee),
        display_order,
        is_active: true,
        is_default: false,
    }
}

/// A small catalog around the current time.
///
/// Promo codes: `SAVE10` (10%, min 500), `FREESHIP`, `LAST5` (100 off,
/// 5 uses left). Zones: Metro Manila (100), Provincial (200, covers Cebu).
#[must_use]
pub fn catalog() -> Catalog {
    let now = Utc::now();
    let sneakers = CategoryId::generate();
    let sneaker = Product {
        id: ProductId::generate(),
        name: "Street Low".to_string(),
        slug: "street-low".to_string(),
        price: Decimal::from(1000),
        sale_price: None,
        stock_quantity: 3,
        sizes: vec![
            Size::with_stock("42".parse().expect("valid size"), 3),
            Size::with_stock("43".parse().expect("valid size"), 0),
        ],
        category_ids: vec![sneakers],
        is_active: true,
    };
    let runner = Product {
        id: ProductId::generate(),
        name: "Trail Runner".to_string(),
        slug: "trail-runner".to_string(),
        price: Decimal::from(2500),
        sale_price: None,
        stock_quantity: 10,
        sizes: Vec::new(),
        category_ids: Vec::new(),
        is_active: true,
    };
    let discount = Discount {
        id: DiscountId::generate(),
        name: "Sneaker Week".to_string(),
        description: None,
        kind: DiscountKind::Percentage,
        value: Decimal::from(20),
        scope: DiscountScope::Category(vec![sneakers]),
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(1),
        priority: 0,
        is_active: true,
        created_at: now - Duration::days(2),
    };

    let mut save10 = promo("SAVE10", PromoKind::Percentage(Decimal::from(10)), now);
    save10.min_order_amount = Decimal::from(500);
    let mut last5 = promo("LAST5", PromoKind::FixedAmount(Decimal::from(100)), now);
    last5.usage_limit = Some(5);

    Catalog {
        sneaker: sneaker.id,
        runner: runner.id,
        seed: MemorySeed {
            products: vec![sneaker, runner],
            discounts: vec![discount],
            promo_codes: vec![
                save10,
                promo("FREESHIP", PromoKind::FreeShipping, now),
                last5,
            ],
            shipping_zones: vec![
                zone("Metro Manila", &["manila", "makati", "quezon city"], 100, 1),
                zone("Provincial", &["cebu", "davao"], 200, 2),
            ],
            sale_promotions: vec![SalePromotion {
                id: SalePromotionId::generate(),
                title: "Mid-Year Sale".to_string(),
                end_date: now + Duration::days(2),
                is_active: true,
                created_at: now - Duration::days(1),
            }],
        },
    }
}

/// A checkout body for one item.
#[must_use]
pub fn checkout_body(
    reference: uuid::Uuid,
    product: ProductId,
    size: Option<&str>,
    city: &str,
    promo_code: Option<&str>,
    payment_method: &str,
) -> Value {
    json!({
        "reference": reference,
        "customer": {
            "name": "Juan Dela Cruz",
            "email": "juan@example.ph",
            "phone": "09171234567",
        },
        "shipping_address": {
            "address": "12 Mabini St",
            "city": city,
            "postal_code": "6000",
        },
        "items": [{
            "product_id": product,
            "quantity": 1,
            "size": size,
        }],
        "promo_code": promo_code,
        "payment_method": payment_method,
    })
}

/// Parse a JSON decimal, which the API sends as a string.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal string: {value}"))
}
