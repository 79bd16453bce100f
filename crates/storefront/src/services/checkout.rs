//! Checkout: server-side re-quote, order placement and payment start.
//!
//! Prices sent by the browser are never trusted. The cart is quoted again
//! here, the order is stored with the quoted totals, and the promo code is
//! redeemed in the same store step. The client-supplied `reference` makes a
//! resubmitted checkout return the existing order instead of a second one.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use stride_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus};

use super::maya::{CheckoutSession, MayaClient, PaymentError};
use super::pricing::{CartItemRequest, PricingService, QuoteError, QuoteRequest};
use crate::models::{Customer, NewOrder, Order, OrderItem, ShippingAddress};
use crate::store::{PricingStore, StoreError};

/// Errors that stop a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    InvalidRequest(String),

    /// The promo code was rejected; the message is shown to the shopper.
    #[error("{0}")]
    PromoRejected(String),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// A checkout submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Idempotency key generated by the client once per checkout attempt.
    pub reference: Uuid,
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub items: Vec<CartItemRequest>,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    fn validate(&self) -> Result<(), CheckoutError> {
        let invalid = |msg: &str| Err(CheckoutError::InvalidRequest(msg.to_string()));

        if self.customer.name.trim().is_empty() {
            return invalid("Name is required");
        }
        let email = self.customer.email.trim();
        if email.is_empty() || !email.contains('@') {
            return invalid("A valid email address is required");
        }
        if self.shipping_address.address.trim().is_empty() {
            return invalid("Shipping address is required");
        }
        if self.shipping_address.city.trim().is_empty() {
            return invalid("City is required");
        }
        if self.items.iter().any(|item| item.quantity == 0) {
            return invalid("Quantity must be at least 1");
        }
        Ok(())
    }
}

/// Result of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// True when the reference had already been used.
    pub replayed: bool,
    /// Where to send the shopper to pay; `None` for cash on delivery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<CheckoutSession>,
}

/// Places orders.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn PricingStore>,
    pricing: PricingService,
    maya: Option<MayaClient>,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        store: Arc<dyn PricingStore>,
        pricing: PricingService,
        maya: Option<MayaClient>,
    ) -> Self {
        Self {
            store,
            pricing,
            maya,
        }
    }

    /// Quote, store and start payment for an order.
    ///
    /// A reference that was already used returns its stored order before
    /// anything is quoted, so a resubmission succeeds even after the promo
    /// code ran out or a product was withdrawn.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for missing customer or address details
    /// - `PromoRejected` when the attached code cannot be used
    /// - `Quote` for cart problems
    /// - `Store` when the order cannot be stored, including
    ///   `StoreError::PromoExhausted` if the code ran out meanwhile
    /// - `Payment` when Maya is required but unavailable or fails
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    pub async fn place_order(&self, request: CheckoutRequest) -> Result<CheckoutOutcome, CheckoutError> {
        request.validate()?;

        let maya = match request.payment_method {
            PaymentMethod::Maya => Some(self.maya.as_ref().ok_or_else(|| {
                PaymentError::NotConfigured("online payment is not enabled".to_string())
            })?),
            PaymentMethod::Cod => None,
        };

        if let Some(existing) = self.store.order_by_reference(request.reference).await? {
            return Self::finish(existing, true, maya).await;
        }

        let quote = self
            .pricing
            .quote(
                &QuoteRequest {
                    items: request.items.clone(),
                    city: Some(request.shipping_address.city.clone()),
                    promo_code: request.promo_code.clone(),
                },
                Utc::now(),
            )
            .await?;

        let promo_code = match &quote.promo {
            Some(promo) if !promo.valid => {
                return Err(CheckoutError::PromoRejected(promo.message.clone()));
            }
            Some(promo) => Some(promo.code.clone()),
            None => None,
        };

        let placed = self
            .store
            .place_order(NewOrder {
                id: OrderId::generate(),
                reference: request.reference,
                customer: request.customer,
                shipping_address: request.shipping_address,
                items: quote.lines.iter().map(OrderItem::from).collect(),
                totals: quote.totals,
                promo_code,
                payment_method: request.payment_method,
            })
            .await?;

        Self::finish(placed.order, placed.replayed, maya).await
    }

    async fn finish(
        order: Order,
        replayed: bool,
        maya: Option<&MayaClient>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if replayed {
            info!(order_id = %order.id, "Checkout resubmitted, returning existing order");
        } else {
            info!(
                order_id = %order.id,
                total = %order.total,
                payment_method = %order.payment_method,
                "Order placed"
            );
        }

        let payment = match maya {
            Some(client) if awaiting_payment(&order) => Some(client.start_payment(&order).await?),
            _ => None,
        };

        Ok(CheckoutOutcome {
            order,
            replayed,
            payment,
        })
    }
}

fn awaiting_payment(order: &Order) -> bool {
    order.status == OrderStatus::Pending && order.payment_status == PaymentStatus::Pending
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;
    use stride_core::catalog::Product;
    use stride_core::pricing::{PromoCode, PromoKind};
    use stride_core::{ProductId, PromoCodeId};

    use super::*;
    use crate::config::PricingSettings;
    use crate::store::{MemorySeed, MemoryStore, StoreOp};

    fn product() -> Product {
        Product {
            id: ProductId::generate(),
            name: "Trail Runner".to_string(),
            slug: "trail-runner".to_string(),
            price: Decimal::from(1500),
            sale_price: Some(Decimal::from(1200)),
            stock_quantity: 8,
            sizes: Vec::new(),
            category_ids: Vec::new(),
            is_active: true,
        }
    }

    fn promo(limit: Option<u32>) -> PromoCode {
        PromoCode {
            id: PromoCodeId::generate(),
            code: "FREESHIP".to_string(),
            description: None,
            kind: PromoKind::FreeShipping,
            min_order_amount: Decimal::ZERO,
            start_date: Utc::now() - Duration::days(1),
            end_date: Utc::now() + Duration::days(1),
            usage_limit: limit,
            times_used: 0,
            is_active: true,
        }
    }

    fn service(product: &Product, limit: Option<u32>) -> (Arc<MemoryStore>, CheckoutService) {
        let store = Arc::new(MemoryStore::new(MemorySeed {
            products: vec![product.clone()],
            promo_codes: vec![promo(limit)],
            ..MemorySeed::default()
        }));
        let pricing = PricingService::new(store.clone(), PricingSettings::default());
        (store.clone(), CheckoutService::new(store, pricing, None))
    }

    fn request(product: &Product, promo_code: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            reference: Uuid::new_v4(),
            customer: Customer {
                name: "Jose Rizal".to_string(),
                email: "jose@example.ph".to_string(),
                phone: None,
            },
            shipping_address: ShippingAddress {
                address: "1 Calle Real".to_string(),
                city: "Calamba".to_string(),
                postal_code: None,
            },
            items: vec![CartItemRequest {
                product_id: product.id,
                quantity: 2,
                size: None,
                color: Some("Black".to_string()),
            }],
            promo_code: promo_code.map(str::to_string),
            payment_method: PaymentMethod::Cod,
        }
    }

    #[tokio::test]
    async fn test_cod_order_uses_server_prices() {
        let product = product();
        let (store, checkout) = service(&product, None);

        let outcome = checkout.place_order(request(&product, None)).await.unwrap();
        assert!(!outcome.replayed);
        assert!(outcome.payment.is_none());
        assert_eq!(outcome.order.subtotal, Decimal::from(2400));
        assert_eq!(outcome.order.shipping_fee, Decimal::from(200));
        assert_eq!(outcome.order.total, Decimal::from(2600));
        assert_eq!(store.orders().await.len(), 1);
    }

    #[tokio::test]
    async fn test_resubmission_returns_same_order() {
        let product = product();
        let (store, checkout) = service(&product, None);
        let req = request(&product, Some("freeship"));

        let first = checkout.place_order(req.clone()).await.unwrap();
        let second = checkout.place_order(req).await.unwrap();

        assert!(second.replayed);
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(store.orders().await.len(), 1);
        assert_eq!(store.promo_times_used("FREESHIP").await, Some(1));
    }

    #[tokio::test]
    async fn test_resubmission_after_last_use_returns_order() {
        let product = product();
        let (store, checkout) = service(&product, Some(1));
        let req = request(&product, Some("FREESHIP"));

        let first = checkout.place_order(req.clone()).await.unwrap();
        assert_eq!(store.promo_times_used("FREESHIP").await, Some(1));

        let second = checkout.place_order(req).await.unwrap();
        assert!(second.replayed);
        assert_eq!(second.order.id, first.order.id);
        assert_eq!(store.orders().await.len(), 1);
        assert_eq!(store.promo_times_used("FREESHIP").await, Some(1));
    }

    #[tokio::test]
    async fn test_resubmission_skips_quote() {
        let product = product();
        let (store, checkout) = service(&product, None);
        let req = request(&product, None);

        let first = checkout.place_order(req.clone()).await.unwrap();
        store.set_failing(StoreOp::Products, true).await;

        let second = checkout.place_order(req).await.unwrap();
        assert!(second.replayed);
        assert_eq!(second.order.id, first.order.id);
    }

    #[tokio::test]
    async fn test_free_shipping_code_waives_fee() {
        let product = product();
        let (_, checkout) = service(&product, None);

        let outcome = checkout
            .place_order(request(&product, Some("freeship")))
            .await
            .unwrap();
        assert_eq!(outcome.order.shipping_fee, Decimal::ZERO);
        assert_eq!(outcome.order.total, Decimal::from(2400));
        assert_eq!(outcome.order.promo_code.as_deref(), Some("FREESHIP"));
    }

    #[tokio::test]
    async fn test_exhausted_code_rejected() {
        let product = product();
        let (_, checkout) = service(&product, Some(1));

        checkout
            .place_order(request(&product, Some("FREESHIP")))
            .await
            .unwrap();
        let err = checkout
            .place_order(request(&product, Some("FREESHIP")))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PromoRejected(_)));
    }

    #[tokio::test]
    async fn test_maya_requires_configuration() {
        let product = product();
        let (store, checkout) = service(&product, None);
        let mut req = request(&product, None);
        req.payment_method = PaymentMethod::Maya;

        let err = checkout.place_order(req).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::NotConfigured(_))
        ));
        assert!(store.orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_details_rejected() {
        let product = product();
        let (_, checkout) = service(&product, None);
        let mut req = request(&product, None);
        req.customer.email = "not-an-email".to_string();

        assert!(matches!(
            checkout.place_order(req).await,
            Err(CheckoutError::InvalidRequest(_))
        ));
    }
}
