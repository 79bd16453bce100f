//! Backing store abstraction for the pricing engine.
//!
//! The resolvers in `stride_core` are pure; this trait is how the service
//! layer fetches their inputs and records redemptions and orders. Two
//! implementations exist: [`crate::db::PgStore`] for production and
//! [`MemoryStore`] for tests and local demos.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use stride_core::catalog::Product;
use stride_core::pricing::{Discount, PromoCode, SalePromotion, ShippingZone};
use stride_core::{OrderId, ProductId};

use crate::models::{NewOrder, Order, PaymentUpdate, PlacedOrder};

pub use memory::{MemorySeed, MemoryStore, StoreOp};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored record could not be converted to a domain type.
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// The promo code's usage counter is already at its limit.
    #[error("Promo code {0} has reached its usage limit")]
    PromoExhausted(String),

    /// The store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read and write access to catalog, pricing records and orders.
#[async_trait]
pub trait PricingStore: Send + Sync {
    /// Short name for logs.
    fn backend_tag(&self) -> &'static str;

    /// Active products with the given ids. Unknown ids are skipped.
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;

    /// A single active product.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products_by_ids(&[id]).await?.into_iter().next())
    }

    /// Enabled discounts that target the product, manually or through one of
    /// its categories. Time windows are left to the resolver.
    async fn discounts_for_product(&self, product: &Product) -> Result<Vec<Discount>, StoreError>;

    /// Case-insensitive promo code lookup.
    async fn promo_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError>;

    /// All shipping zones; the resolver filters inactive ones.
    async fn shipping_zones(&self) -> Result<Vec<ShippingZone>, StoreError>;

    /// Enabled sale banners that have not ended at `now`.
    async fn sale_promotions(&self, now: DateTime<Utc>) -> Result<Vec<SalePromotion>, StoreError>;

    /// Count one use of a code if its limit allows.
    ///
    /// Returns false when the code is exhausted or unknown. The check and the
    /// increment happen as one step, so concurrent callers never push
    /// `times_used` past `usage_limit`.
    async fn redeem_promo_code(&self, code: &str) -> Result<bool, StoreError>;

    /// Insert an order, redeeming its promo code in the same step.
    ///
    /// If an order with the same `reference` exists it is returned unchanged
    /// and nothing is redeemed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PromoExhausted`] if the promo code has no uses
    /// left; the order is not stored.
    async fn place_order(&self, order: NewOrder) -> Result<PlacedOrder, StoreError>;

    /// Record a payment outcome. Returns `None` for an unknown order.
    ///
    /// A paid order keeps its statuses unless the update is also a payment;
    /// the order is then returned unchanged.
    async fn update_order_payment(
        &self,
        id: OrderId,
        update: PaymentUpdate,
    ) -> Result<Option<Order>, StoreError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// The order placed with a checkout reference, if any.
    async fn order_by_reference(&self, reference: Uuid) -> Result<Option<Order>, StoreError>;

    /// Readiness check.
    async fn ping(&self) -> Result<(), StoreError>;
}
