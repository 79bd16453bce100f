//! Database operations for the storefront `PostgreSQL`.
//!
//! # Schema: `shop`
//!
//! - `category`, `product` - catalog as the pricing engine reads it
//! - `discount`, `discount_product` - time-windowed discounts and manual links
//! - `promo_code` - codes, unique on `upper(code)`, with a usage counter
//! - `shipping_zone` - city aliases and fees
//! - `sale_promotion` - storefront sale banner
//! - `order` - orders placed through checkout
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p stride-cli -- migrate
//! ```
//!
//! Queries are runtime-checked (`sqlx::query_as` into `FromRow` rows) and
//! rows are converted to core types; anything that does not convert is
//! reported as [`StoreError::DataCorruption`].

pub mod catalog;
pub mod discounts;
pub mod orders;
pub mod promo_codes;
pub mod sale_promotions;
pub mod shipping_zones;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{instrument, warn};
use uuid::Uuid;

use stride_core::catalog::Product;
use stride_core::pricing::{Discount, PromoCode, SalePromotion, ShippingZone};
use stride_core::{OrderId, ProductId};

pub use catalog::CatalogRepository;
pub use discounts::DiscountRepository;
pub use orders::OrderRepository;
pub use promo_codes::PromoCodeRepository;
pub use sale_promotions::SalePromotionRepository;
pub use shipping_zones::ShippingZoneRepository;

use crate::models::{NewOrder, Order, PaymentUpdate, PlacedOrder};
use crate::store::{PricingStore, StoreError};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a stored non-negative integer column.
pub(crate) fn to_u32(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::DataCorruption(format!("negative {column} in database: {value}")))
}

/// Convert a count to the `INTEGER` column type.
pub(crate) fn to_i32(value: u32, column: &str) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::DataCorruption(format!("{column} out of range: {value}")))
}

/// [`PricingStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PricingStore for PgStore {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        CatalogRepository::new(&self.pool).products_by_ids(ids).await
    }

    async fn discounts_for_product(&self, product: &Product) -> Result<Vec<Discount>, StoreError> {
        DiscountRepository::new(&self.pool).for_product(product).await
    }

    async fn promo_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        PromoCodeRepository::new(&self.pool).find_by_code(code).await
    }

    async fn shipping_zones(&self) -> Result<Vec<ShippingZone>, StoreError> {
        ShippingZoneRepository::new(&self.pool).list().await
    }

    async fn sale_promotions(&self, now: DateTime<Utc>) -> Result<Vec<SalePromotion>, StoreError> {
        SalePromotionRepository::new(&self.pool).running_at(now).await
    }

    async fn redeem_promo_code(&self, code: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        promo_codes::redeem(&mut conn, code).await
    }

    #[instrument(skip(self, order), fields(reference = %order.reference))]
    async fn place_order(&self, order: NewOrder) -> Result<PlacedOrder, StoreError> {
        let reference = order.reference;
        let mut tx = self.pool.begin().await?;

        if let Some(existing) = orders::find_by_reference(&mut tx, reference).await? {
            return Ok(PlacedOrder {
                order: existing,
                replayed: true,
            });
        }

        if let Some(code) = &order.promo_code
            && !promo_codes::redeem(&mut tx, code).await?
        {
            return Err(StoreError::PromoExhausted(code.clone()));
        }

        match orders::insert(&mut tx, order).await {
            Ok(stored) => {
                tx.commit().await?;
                Ok(PlacedOrder {
                    order: stored,
                    replayed: false,
                })
            }
            // A concurrent submission with the same reference won the race.
            // Dropping the transaction rolls back our redemption.
            Err(StoreError::Database(sqlx::Error::Database(db_err)))
                if db_err.is_unique_violation() =>
            {
                drop(tx);
                warn!("Duplicate order reference, returning the stored order");
                let existing = OrderRepository::new(&self.pool)
                    .get_by_reference(reference)
                    .await?
                    .ok_or_else(|| {
                        StoreError::DataCorruption(format!(
                            "order reference {reference} conflicted but no order was found"
                        ))
                    })?;
                Ok(PlacedOrder {
                    order: existing,
                    replayed: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn update_order_payment(
        &self,
        id: OrderId,
        update: PaymentUpdate,
    ) -> Result<Option<Order>, StoreError> {
        OrderRepository::new(&self.pool).update_payment(id, &update).await
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        OrderRepository::new(&self.pool).get(id).await
    }

    async fn order_by_reference(&self, reference: Uuid) -> Result<Option<Order>, StoreError> {
        OrderRepository::new(&self.pool)
            .get_by_reference(reference)
            .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
