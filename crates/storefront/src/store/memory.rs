use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use stride_core::catalog::Product;
use stride_core::pricing::{Discount, PromoCode, SalePromotion, ShippingZone, normalize_code};
use stride_core::{OrderId, ProductId};

use super::{PricingStore, StoreError};
use crate::models::{NewOrder, Order, PaymentUpdate, PlacedOrder};

/// Initial contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemorySeed {
    pub products: Vec<Product>,
    pub discounts: Vec<Discount>,
    pub promo_codes: Vec<PromoCode>,
    pub shipping_zones: Vec<ShippingZone>,
    pub sale_promotions: Vec<SalePromotion>,
}

/// Store operations that can be switched off to exercise degraded paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Products,
    Discounts,
    PromoCodes,
    ShippingZones,
    Orders,
    Ping,
}

#[derive(Debug, Default)]
struct MemoryData {
    products: Vec<Product>,
    discounts: Vec<Discount>,
    promo_codes: Vec<PromoCode>,
    shipping_zones: Vec<ShippingZone>,
    sale_promotions: Vec<SalePromotion>,
    orders: Vec<Order>,
}

/// In-process store guarded by a single mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
    failing: Mutex<HashSet<StoreOp>>,
    discount_fetches: AtomicU64,
    zone_fetches: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new(seed: MemorySeed) -> Self {
        Self {
            data: Mutex::new(MemoryData {
                products: seed.products,
                discounts: seed.discounts,
                promo_codes: seed.promo_codes,
                shipping_zones: seed.shipping_zones,
                sale_promotions: seed.sale_promotions,
                orders: Vec::new(),
            }),
            ..Self::default()
        }
    }

    /// Make an operation fail with [`StoreError::Unavailable`] until reset.
    pub async fn set_failing(&self, op: StoreOp, failing: bool) {
        let mut ops = self.failing.lock().await;
        if failing {
            ops.insert(op);
        } else {
            ops.remove(&op);
        }
    }

    /// Current usage count of a code.
    pub async fn promo_times_used(&self, code: &str) -> Option<u32> {
        let wanted = normalize_code(code);
        self.data
            .lock()
            .await
            .promo_codes
            .iter()
            .find(|p| p.code == wanted)
            .map(|p| p.times_used)
    }

    /// All stored orders, oldest first.
    pub async fn orders(&self) -> Vec<Order> {
        self.data.lock().await.orders.clone()
    }

    /// Replace a shipping zone list, e.g. to check cache expiry.
    pub async fn replace_shipping_zones(&self, zones: Vec<ShippingZone>) {
        self.data.lock().await.shipping_zones = zones;
    }

    /// Number of discount lookups served.
    pub fn discount_fetches(&self) -> u64 {
        self.discount_fetches.load(Ordering::Relaxed)
    }

    /// Number of shipping zone lookups served.
    pub fn zone_fetches(&self) -> u64 {
        self.zone_fetches.load(Ordering::Relaxed)
    }

    async fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.lock().await.contains(&op) {
            return Err(StoreError::Unavailable(format!("{op:?} store is offline")));
        }
        Ok(())
    }
}

#[async_trait]
impl PricingStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        self.check(StoreOp::Products).await?;
        let data = self.data.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| data.products.iter().find(|p| p.id == *id && p.is_active))
            .cloned()
            .collect())
    }

    async fn discounts_for_product(&self, product: &Product) -> Result<Vec<Discount>, StoreError> {
        self.check(StoreOp::Discounts).await?;
        self.discount_fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .data
            .lock()
            .await
            .discounts
            .iter()
            .filter(|d| d.is_active && d.applies_to(product))
            .cloned()
            .collect())
    }

    async fn promo_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        self.check(StoreOp::PromoCodes).await?;
        let data = self.data.lock().await;
        Ok(stride_core::pricing::find_promo_code(&data.promo_codes, code).cloned())
    }

    async fn shipping_zones(&self) -> Result<Vec<ShippingZone>, StoreError> {
        self.check(StoreOp::ShippingZones).await?;
        self.zone_fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self.data.lock().await.shipping_zones.clone())
    }

    async fn sale_promotions(&self, now: DateTime<Utc>) -> Result<Vec<SalePromotion>, StoreError> {
        Ok(self
            .data
            .lock()
            .await
            .sale_promotions
            .iter()
            .filter(|s| s.is_active && s.end_date > now)
            .cloned()
            .collect())
    }

    async fn redeem_promo_code(&self, code: &str) -> Result<bool, StoreError> {
        self.check(StoreOp::PromoCodes).await?;
        let wanted = normalize_code(code);
        let mut data = self.data.lock().await;
        Ok(data
            .promo_codes
            .iter_mut()
            .find(|p| p.code == wanted)
            .is_some_and(PromoCode::redeem))
    }

    async fn place_order(&self, order: NewOrder) -> Result<PlacedOrder, StoreError> {
        self.check(StoreOp::Orders).await?;
        let mut data = self.data.lock().await;

        if let Some(existing) = data.orders.iter().find(|o| o.reference == order.reference) {
            return Ok(PlacedOrder {
                order: existing.clone(),
                replayed: true,
            });
        }

        if let Some(code) = &order.promo_code {
            let wanted = normalize_code(code);
            let redeemed = data
                .promo_codes
                .iter_mut()
                .find(|p| p.code == wanted)
                .is_some_and(PromoCode::redeem);
            if !redeemed {
                return Err(StoreError::PromoExhausted(wanted));
            }
        }

        let stored = order.into_order(Utc::now());
        data.orders.push(stored.clone());
        Ok(PlacedOrder {
            order: stored,
            replayed: false,
        })
    }

    async fn update_order_payment(
        &self,
        id: OrderId,
        update: PaymentUpdate,
    ) -> Result<Option<Order>, StoreError> {
        self.check(StoreOp::Orders).await?;
        let mut data = self.data.lock().await;
        Ok(data.orders.iter_mut().find(|o| o.id == id).map(|order| {
            if !update.apply(order, Utc::now()) {
                debug!(order_id = %order.id, "Paid order kept, update ignored");
            }
            order.clone()
        }))
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.check(StoreOp::Orders).await?;
        Ok(self
            .data
            .lock()
            .await
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn order_by_reference(&self, reference: Uuid) -> Result<Option<Order>, StoreError> {
        self.check(StoreOp::Orders).await?;
        Ok(self
            .data
            .lock()
            .await
            .orders
            .iter()
            .find(|o| o.reference == reference)
            .cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check(StoreOp::Ping).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use rust_decimal::Decimal;
    use stride_core::PromoCodeId;
    use stride_core::pricing::PromoKind;

    use super::*;

    fn limited_code(limit: u32) -> PromoCode {
        PromoCode {
            id: PromoCodeId::generate(),
            code: "LAUNCH".to_string(),
            description: None,
            kind: PromoKind::Percentage(Decimal::from(15)),
            min_order_amount: Decimal::ZERO,
            start_date: Utc::now() - Duration::days(1),
            end_date: Utc::now() + Duration::days(1),
            usage_limit: Some(limit),
            times_used: 0,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_respect_limit() {
        let store = Arc::new(MemoryStore::new(MemorySeed {
            promo_codes: vec![limited_code(3)],
            ..MemorySeed::default()
        }));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.redeem_promo_code("launch").await.unwrap() })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 3);
        assert_eq!(store.promo_times_used("LAUNCH").await, Some(3));
    }

    #[tokio::test]
    async fn test_unknown_code_not_redeemed() {
        let store = MemoryStore::default();
        assert!(!store.redeem_promo_code("NOPE").await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_op_reports_unavailable() {
        let store = MemoryStore::default();
        store.set_failing(StoreOp::ShippingZones, true).await;
        assert!(matches!(
            store.shipping_zones().await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_failing(StoreOp::ShippingZones, false).await;
        assert!(store.shipping_zones().await.unwrap().is_empty());
    }
}
