//! Pricing service: feeds store records into the core resolvers.
//!
//! Shipping zones and per-product discount candidates are cached with `moka`
//! for the configured TTL. Promo codes are never cached, since their usage
//! counters change with every order.
//!
//! Store failures degrade instead of failing the request:
//! - discounts unavailable: prices resolve without a discount
//! - promo codes unavailable: the code is reported invalid
//! - shipping zones unavailable: the default fee applies

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use stride_core::ProductId;
use stride_core::cart::Cart;
use stride_core::catalog::Product;
use stride_core::pricing::{
    Countdown, Discount, OrderTotals, PricedLine, PromoCode, RejectionKind, ResolvedPrice,
    SalePromotion, ShippingBasis, ShippingQuote, ShippingZone, active_sale_promotion,
    compute_order_total, compute_promo_discount, normalize_code, price_lines, resolve_price,
    resolve_shipping_fee, validate_promo_code,
};
use stride_core::size::{SizeScale, SizeValue, is_size_available};

use crate::config::PricingSettings;
use crate::store::{PricingStore, StoreError};

/// Shown when the promo store cannot be read.
pub const PROMO_LOOKUP_FAILED: &str = "Error validating promo code";

/// Shown when a code is accepted.
pub const PROMO_APPLIED: &str = "Promo code applied";

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    ShippingZones,
    ProductDiscounts(ProductId),
}

#[derive(Debug, Clone)]
enum CacheValue {
    ShippingZones(Arc<Vec<ShippingZone>>),
    Discounts(Arc<Vec<Discount>>),
}

/// Errors that stop a cart from being quoted.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Quantity must be at least 1")]
    InvalidQuantity(ProductId),

    #[error("Product {0} is not available")]
    UnknownProduct(ProductId),

    #[error("Size {size} is not available for {product}")]
    SizeUnavailable { product: String, size: SizeValue },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One requested cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// EU size.
    #[serde(default)]
    pub size: Option<SizeValue>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Cart contents and destination to quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<CartItemRequest>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub promo_code: Option<String>,
}

/// Outcome of checking a promo code against a subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoValidation {
    pub valid: bool,
    /// The code as entered, normalized.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo: Option<PromoCode>,
    /// Amount taken off the subtotal.
    pub discount: Decimal,
    pub free_shipping: bool,
}

impl PromoValidation {
    fn rejected(code: String, message: String, reason: Option<RejectionKind>) -> Self {
        Self {
            valid: false,
            code,
            message,
            reason,
            promo: None,
            discount: Decimal::ZERO,
            free_shipping: false,
        }
    }

    /// The accepted code, if any.
    #[must_use]
    pub fn accepted(&self) -> Option<&PromoCode> {
        if self.valid { self.promo.as_ref() } else { None }
    }
}

/// A fully priced cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub totals: OrderTotals,
    pub shipping: ShippingQuote,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo: Option<PromoValidation>,
}

/// The running sale banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleBanner {
    pub promotion: SalePromotion,
    pub countdown: Countdown,
}

/// Pricing operations over a [`PricingStore`].
#[derive(Clone)]
pub struct PricingService {
    store: Arc<dyn PricingStore>,
    cache: Cache<CacheKey, CacheValue>,
    settings: PricingSettings,
}

impl PricingService {
    #[must_use]
    pub fn new(store: Arc<dyn PricingStore>, settings: PricingSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(settings.cache_ttl)
            .build();

        Self {
            store,
            cache,
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &PricingSettings {
        &self.settings
    }

    /// Drop all cached zones and discounts.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    // =========================================================================
    // Cached reads
    // =========================================================================

    async fn product_discounts(&self, product: &Product) -> Result<Arc<Vec<Discount>>, StoreError> {
        let key = CacheKey::ProductDiscounts(product.id);
        if let Some(CacheValue::Discounts(discounts)) = self.cache.get(&key).await {
            debug!(product_id = %product.id, "Cache hit for discounts");
            return Ok(discounts);
        }

        let discounts = Arc::new(self.store.discounts_for_product(product).await?);
        self.cache
            .insert(key, CacheValue::Discounts(Arc::clone(&discounts)))
            .await;
        Ok(discounts)
    }

    /// Discount candidates for all products, or none if the store fails.
    async fn discounts_for(&self, products: &[Product]) -> Vec<Discount> {
        let mut seen = HashSet::new();
        let mut all = Vec::new();
        for product in products {
            match self.product_discounts(product).await {
                Ok(discounts) => all.extend(
                    discounts
                        .iter()
                        .filter(|d| seen.insert(d.id))
                        .cloned(),
                ),
                Err(e) => {
                    warn!(error = %e, product_id = %product.id, "Discount lookup failed, pricing without discount");
                }
            }
        }
        all
    }

    async fn shipping_zones(&self) -> Result<Arc<Vec<ShippingZone>>, StoreError> {
        if let Some(CacheValue::ShippingZones(zones)) = self.cache.get(&CacheKey::ShippingZones).await
        {
            debug!("Cache hit for shipping zones");
            return Ok(zones);
        }

        let zones = Arc::new(self.store.shipping_zones().await?);
        self.cache
            .insert(
                CacheKey::ShippingZones,
                CacheValue::ShippingZones(Arc::clone(&zones)),
            )
            .await;
        Ok(zones)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Resolved price of one product, or `None` if it is unknown or inactive.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the product cannot be read.
    #[instrument(skip(self))]
    pub async fn product_price(
        &self,
        id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Option<ResolvedPrice>, StoreError> {
        let Some(product) = self.store.product(id).await? else {
            return Ok(None);
        };
        let discounts = self.discounts_for(std::slice::from_ref(&product)).await;
        Ok(Some(resolve_price(
            &product,
            &discounts,
            now,
            self.settings.tie_break,
        )))
    }

    /// Check a promo code against an order subtotal. Never counts a use.
    #[instrument(skip(self))]
    pub async fn validate_promo(
        &self,
        code: &str,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> PromoValidation {
        let lookup = self.store.promo_code(code).await;
        evaluate_promo(code, lookup, subtotal, now)
    }

    /// Shipping fee for a city.
    #[instrument(skip(self))]
    pub async fn shipping_fee(&self, city: &str, free_shipping: bool) -> ShippingQuote {
        if free_shipping {
            return ShippingQuote::flat(Decimal::ZERO, ShippingBasis::FreeShippingPromo);
        }
        let zones = self.shipping_zones().await;
        self.quote_shipping(city, false, zones)
    }

    fn quote_shipping(
        &self,
        city: &str,
        free_shipping: bool,
        zones: Result<Arc<Vec<ShippingZone>>, StoreError>,
    ) -> ShippingQuote {
        let default_fee = self.settings.default_shipping_fee;
        match zones {
            Ok(zones) => resolve_shipping_fee(city, free_shipping, &zones, default_fee),
            Err(_) if free_shipping => {
                ShippingQuote::flat(Decimal::ZERO, ShippingBasis::FreeShippingPromo)
            }
            Err(e) => {
                warn!(error = %e, "Shipping zone lookup failed, using default fee");
                ShippingQuote::flat(default_fee, ShippingBasis::StoreUnavailable)
            }
        }
    }

    /// The sale banner to show, if any. A store failure hides the banner.
    #[instrument(skip(self))]
    pub async fn sale_banner(&self, now: DateTime<Utc>) -> Option<SaleBanner> {
        let promotions = match self.store.sale_promotions(now).await {
            Ok(promotions) => promotions,
            Err(e) => {
                warn!(error = %e, "Sale promotion lookup failed");
                return None;
            }
        };
        active_sale_promotion(&promotions, now).map(|promotion| SaleBanner {
            promotion: promotion.clone(),
            countdown: promotion.time_remaining(now),
        })
    }

    /// Price a cart: lines, promo, shipping and totals.
    ///
    /// An invalid promo code does not fail the quote; it is reported in
    /// [`Quote::promo`] and not applied.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError` for an empty cart, a zero quantity, an unknown
    /// product, a size the product is not offered in, or when products
    /// cannot be read.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn quote(&self, request: &QuoteRequest, now: DateTime<Utc>) -> Result<Quote, QuoteError> {
        if request.items.is_empty() {
            return Err(QuoteError::EmptyCart);
        }
        if let Some(item) = request.items.iter().find(|item| item.quantity == 0) {
            return Err(QuoteError::InvalidQuantity(item.product_id));
        }

        let ids: Vec<ProductId> = request.items.iter().map(|item| item.product_id).collect();
        let products = self.store.products_by_ids(&ids).await?;
        let cart = build_cart(&request.items, &products)?;

        let promo_code = request
            .promo_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty());
        let city = request.city.as_deref().unwrap_or_default();

        let (discounts, promo_lookup, zones) = tokio::join!(
            self.discounts_for(&products),
            async {
                match promo_code {
                    Some(code) => Some(self.store.promo_code(code).await),
                    None => None,
                }
            },
            self.shipping_zones(),
        );

        let lines = price_lines(&cart, &discounts, now, self.settings.tie_break);
        let subtotal: Decimal = lines.iter().map(|line| line.line_total).sum();

        let promo = promo_code
            .zip(promo_lookup)
            .map(|(code, lookup)| evaluate_promo(code, lookup, subtotal, now));
        let accepted = promo.as_ref().and_then(PromoValidation::accepted);

        let shipping = self.quote_shipping(
            city,
            accepted.is_some_and(PromoCode::is_free_shipping),
            zones,
        );
        let totals = compute_order_total(&lines, accepted, shipping.fee);

        Ok(Quote {
            lines,
            totals,
            shipping,
            promo,
        })
    }
}

fn evaluate_promo(
    code: &str,
    lookup: Result<Option<PromoCode>, StoreError>,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> PromoValidation {
    let normalized = normalize_code(code);
    let found = match lookup {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, code = %normalized, "Promo code lookup failed");
            return PromoValidation::rejected(normalized, PROMO_LOOKUP_FAILED.to_string(), None);
        }
    };

    match validate_promo_code(found.as_ref(), subtotal, now) {
        Ok(promo) => PromoValidation {
            valid: true,
            code: normalized,
            message: PROMO_APPLIED.to_string(),
            reason: None,
            discount: compute_promo_discount(promo, subtotal),
            free_shipping: promo.is_free_shipping(),
            promo: Some(promo.clone()),
        },
        Err(rejection) => {
            PromoValidation::rejected(normalized, rejection.to_string(), Some(rejection.kind()))
        }
    }
}

fn build_cart(items: &[CartItemRequest], products: &[Product]) -> Result<Cart, QuoteError> {
    let mut cart = Cart::new();
    for item in items {
        let product = products
            .iter()
            .find(|p| p.id == item.product_id)
            .ok_or(QuoteError::UnknownProduct(item.product_id))?;

        if let Some(size) = item.size
            && !product.sizes.is_empty()
            && !is_size_available(&product.sizes, size, SizeScale::Eu)
        {
            return Err(QuoteError::SizeUnavailable {
                product: product.name.clone(),
                size,
            });
        }

        cart.add_item(product.clone(), item.quantity, item.size, item.color.clone());
    }
    Ok(cart)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::{Duration, TimeZone};
    use stride_core::pricing::{DiscountKind, DiscountScope, PromoKind, TieBreak};
    use stride_core::size::Size;
    use stride_core::{CategoryId, DiscountId, PromoCodeId, ShippingZoneId};

    use super::*;
    use crate::store::{MemorySeed, MemoryStore, StoreOp};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn settings() -> PricingSettings {
        PricingSettings {
            default_shipping_fee: Decimal::from(200),
            cache_ttl: StdDuration::from_secs(60),
            tie_break: TieBreak::default(),
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        service: PricingService,
        product: Product,
    }

    fn fixture() -> Fixture {
        let sneakers = CategoryId::generate();
        let product = Product {
            id: ProductId::generate(),
            name: "Street Low".to_string(),
            slug: "street-low".to_string(),
            price: Decimal::from(1000),
            sale_price: None,
            stock_quantity: 5,
            sizes: vec![
                Size::with_stock("42".parse().unwrap(), 3),
                Size::with_stock("43".parse().unwrap(), 0),
            ],
            category_ids: vec![sneakers],
            is_active: true,
        };
        let discount = Discount {
            id: DiscountId::generate(),
            name: "Sneaker Week".to_string(),
            description: None,
            kind: DiscountKind::Percentage,
            value: Decimal::from(20),
            scope: DiscountScope::Category(vec![sneakers]),
            start_date: now() - Duration::days(1),
            end_date: now() + Duration::days(1),
            priority: 0,
            is_active: true,
            created_at: now() - Duration::days(2),
        };
        let promo = PromoCode {
            id: PromoCodeId::generate(),
            code: "SAVE10".to_string(),
            description: None,
            kind: PromoKind::Percentage(Decimal::from(10)),
            min_order_amount: Decimal::from(500),
            start_date: now() - Duration::days(1),
            end_date: now() + Duration::days(1),
            usage_limit: None,
            times_used: 0,
            is_active: true,
        };
        let zones = vec![
            ShippingZone {
                id: ShippingZoneId::generate(),
                name: "Metro Manila".to_string(),
                cities: vec!["manila".to_string(), "makati".to_string()],
                shipping_fee: Decimal::from(100),
                display_order: 1,
                is_active: true,
                is_default: false,
            },
            ShippingZone {
                id: ShippingZoneId::generate(),
                name: "Provincial".to_string(),
                cities: vec!["cebu".to_string()],
                shipping_fee: Decimal::from(200),
                display_order: 2,
                is_active: true,
                is_default: false,
            },
        ];

        let store = Arc::new(MemoryStore::new(MemorySeed {
            products: vec![product.clone()],
            discounts: vec![discount],
            promo_codes: vec![promo],
            shipping_zones: zones,
            sale_promotions: Vec::new(),
        }));
        let service = PricingService::new(store.clone(), settings());
        Fixture {
            store,
            service,
            product,
        }
    }

    fn cart_request(fx: &Fixture, promo: Option<&str>, city: &str) -> QuoteRequest {
        QuoteRequest {
            items: vec![CartItemRequest {
                product_id: fx.product.id,
                quantity: 1,
                size: Some("42".parse().unwrap()),
                color: None,
            }],
            city: Some(city.to_string()),
            promo_code: promo.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_quote_end_to_end() {
        let fx = fixture();
        let quote = fx
            .service
            .quote(&cart_request(&fx, Some("save10"), "Cebu City"), now())
            .await
            .unwrap();

        assert_eq!(quote.lines[0].unit_price, Decimal::from(800));
        assert_eq!(quote.totals.subtotal, Decimal::from(800));
        assert_eq!(quote.totals.discount, Decimal::from(80));
        assert_eq!(quote.totals.shipping, Decimal::from(200));
        assert_eq!(quote.totals.total, Decimal::from(920));
        assert!(quote.promo.unwrap().valid);
    }

    #[tokio::test]
    async fn test_invalid_promo_is_reported_not_applied() {
        let fx = fixture();
        let quote = fx
            .service
            .quote(&cart_request(&fx, Some("NOPE"), "Makati"), now())
            .await
            .unwrap();

        let promo = quote.promo.unwrap();
        assert!(!promo.valid);
        assert_eq!(promo.reason, Some(RejectionKind::NotFound));
        assert_eq!(quote.totals.discount, Decimal::ZERO);
        assert_eq!(quote.totals.total, Decimal::from(900));
    }

    #[tokio::test]
    async fn test_discounts_are_cached() {
        let fx = fixture();
        fx.service.product_price(fx.product.id, now()).await.unwrap();
        fx.service.product_price(fx.product.id, now()).await.unwrap();
        assert_eq!(fx.store.discount_fetches(), 1);

        fx.service.invalidate_cache();
        fx.service.product_price(fx.product.id, now()).await.unwrap();
        assert_eq!(fx.store.discount_fetches(), 2);
    }

    #[tokio::test]
    async fn test_discount_store_failure_prices_without_discount() {
        let fx = fixture();
        fx.store.set_failing(StoreOp::Discounts, true).await;

        let price = fx
            .service
            .product_price(fx.product.id, now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(price.unit_price, Decimal::from(1000));
        assert!(price.discount.is_none());
    }

    #[tokio::test]
    async fn test_promo_store_failure_reports_lookup_error() {
        let fx = fixture();
        fx.store.set_failing(StoreOp::PromoCodes, true).await;

        let result = fx
            .service
            .validate_promo("SAVE10", Decimal::from(800), now())
            .await;
        assert!(!result.valid);
        assert_eq!(result.message, PROMO_LOOKUP_FAILED);
        assert_eq!(result.reason, None);
    }

    #[tokio::test]
    async fn test_zone_store_failure_uses_default_fee() {
        let fx = fixture();
        fx.store.set_failing(StoreOp::ShippingZones, true).await;

        let quote = fx.service.shipping_fee("Makati", false).await;
        assert_eq!(quote.fee, Decimal::from(200));
        assert_eq!(quote.basis, ShippingBasis::StoreUnavailable);
    }

    #[tokio::test]
    async fn test_shipping_zones_cached_until_invalidated() {
        let fx = fixture();
        assert_eq!(
            fx.service.shipping_fee("Makati", false).await.fee,
            Decimal::from(100)
        );
        fx.store.replace_shipping_zones(Vec::new()).await;
        assert_eq!(
            fx.service.shipping_fee("Makati", false).await.fee,
            Decimal::from(100)
        );
        assert_eq!(fx.store.zone_fetches(), 1);

        fx.service.invalidate_cache();
        let quote = fx.service.shipping_fee("Makati", false).await;
        assert_eq!(quote.basis, ShippingBasis::NoZones);
    }

    #[tokio::test]
    async fn test_free_shipping_skips_zone_lookup() {
        let fx = fixture();
        let quote = fx.service.shipping_fee("Makati", true).await;
        assert_eq!(quote.fee, Decimal::ZERO);
        assert_eq!(fx.store.zone_fetches(), 0);
    }

    #[tokio::test]
    async fn test_out_of_stock_size_rejected() {
        let fx = fixture();
        let mut request = cart_request(&fx, None, "Makati");
        request.items[0].size = Some("43".parse().unwrap());

        let err = fx.service.quote(&request, now()).await.unwrap_err();
        assert!(matches!(err, QuoteError::SizeUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let fx = fixture();
        let mut request = cart_request(&fx, None, "Makati");
        request.items[0].quantity = 0;

        let err = fx.service.quote(&request, now()).await.unwrap_err();
        assert!(matches!(err, QuoteError::InvalidQuantity(id) if id == fx.product.id));
        assert_eq!(err.to_string(), "Quantity must be at least 1");
    }

    #[tokio::test]
    async fn test_unknown_product_and_empty_cart() {
        let fx = fixture();
        let mut request = cart_request(&fx, None, "Makati");
        request.items[0].product_id = ProductId::generate();
        assert!(matches!(
            fx.service.quote(&request, now()).await,
            Err(QuoteError::UnknownProduct(_))
        ));

        request.items.clear();
        assert!(matches!(
            fx.service.quote(&request, now()).await,
            Err(QuoteError::EmptyCart)
        ));
    }
}
