//! Seed the catalog and promotions from a YAML file.
//!
//! Categories and products are upserted by slug and promo codes by code, so
//! re-running a file updates them in place. Discounts, shipping zones and sale
//! promotions are appended on every run.
//!
//! ```yaml
//! categories:
//!   - { slug: sneakers, name: Sneakers }
//! products:
//!   - slug: street-low
//!     name: Street Low
//!     price: "2500"
//!     stock_quantity: 12
//!     sizes: [{ value: "42", stock: 3 }, { value: "43" }]
//!     categories: [sneakers]
//! discounts:
//!   - name: Sneaker Week
//!     kind: percentage
//!     value: "20"
//!     categories: [sneakers]
//!     start_date: 2024-06-01T00:00:00Z
//!     end_date: 2024-06-08T00:00:00Z
//! promo_codes:
//!   - { code: SAVE10, discount_type: percentage, discount_value: "10",
//!       start_date: 2024-06-01T00:00:00Z, end_date: 2024-12-31T00:00:00Z }
//! shipping_zones:
//!   - { name: Metro Manila, cities: [Manila, Makati], shipping_fee: "100" }
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use stride_core::catalog::{Category, Product};
use stride_core::pricing::{
    DiscountDraft, DiscountKind, DiscountScope, PromoCodeDraft, SalePromotion, ShippingZoneDraft,
};
use stride_core::size::Size;
use stride_core::{CategoryId, DiscountId, ProductId, PromoCodeId, SalePromotionId, ShippingZoneId};
use stride_storefront::db::{
    CatalogRepository, DiscountRepository, PromoCodeRepository, SalePromotionRepository,
    ShippingZoneRepository,
};

/// Top-level layout of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedFile {
    pub categories: Vec<CategorySeed>,
    pub products: Vec<ProductSeed>,
    pub discounts: Vec<DiscountSeed>,
    pub promo_codes: Vec<PromoCodeDraft>,
    pub shipping_zones: Vec<ShippingZoneDraft>,
    pub sale_promotions: Vec<SaleSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub slug: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default)]
    pub sizes: Vec<Size>,
    /// Category slugs.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A discount that names its targets by slug.
#[derive(Debug, Deserialize)]
pub struct DiscountSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: Decimal,
    /// Product slugs; makes the discount manual.
    #[serde(default)]
    pub products: Vec<String>,
    /// Category slugs; used when `products` is empty.
    #[serde(default)]
    pub categories: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SaleSeed {
    pub title: String,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

/// Counts of what a seed run wrote.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub products: usize,
    pub discounts: usize,
    pub promo_codes: usize,
    pub shipping_zones: usize,
    pub sale_promotions: usize,
}

impl DiscountSeed {
    /// Resolve slugs into a scope using the given lookups.
    fn scope(
        &self,
        products: &HashMap<String, ProductId>,
        categories: &HashMap<String, CategoryId>,
    ) -> Result<DiscountScope, String> {
        if self.products.is_empty() {
            self.categories
                .iter()
                .map(|slug| {
                    categories
                        .get(slug)
                        .copied()
                        .ok_or_else(|| format!("discount '{}': unknown category '{slug}'", self.name))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(DiscountScope::Category)
        } else {
            self.products
                .iter()
                .map(|slug| {
                    products
                        .get(slug)
                        .copied()
                        .ok_or_else(|| format!("discount '{}': unknown product '{slug}'", self.name))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(DiscountScope::Manual)
        }
    }

    fn into_draft(self, scope: DiscountScope) -> DiscountDraft {
        DiscountDraft {
            name: self.name,
            description: self.description,
            kind: self.kind,
            value: self.value,
            scope,
            start_date: self.start_date,
            end_date: self.end_date,
            priority: self.priority,
            is_active: self.is_active,
        }
    }
}

/// Check a seed file without touching the database.
///
/// Slugs are resolved against placeholder ids, so every cross reference and
/// every draft rule is checked before the first write.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    let categories: HashMap<String, CategoryId> = seed
        .categories
        .iter()
        .map(|c| (c.slug.clone(), CategoryId::generate()))
        .collect();
    for category in &seed.categories {
        if category.slug.trim().is_empty() || category.name.trim().is_empty() {
            errors.push(format!("category '{}': slug and name are required", category.slug));
        }
    }

    let mut products = HashMap::new();
    for product in &seed.products {
        if products
            .insert(product.slug.clone(), ProductId::generate())
            .is_some()
        {
            errors.push(format!("product '{}': duplicate slug", product.slug));
        }
        if product.price <= Decimal::ZERO {
            errors.push(format!("product '{}': price must be greater than 0", product.slug));
        }
        if product.sale_price.is_some_and(|sale| sale < Decimal::ZERO) {
            errors.push(format!("product '{}': sale price cannot be negative", product.slug));
        }
        for slug in &product.categories {
            if !categories.contains_key(slug) {
                errors.push(format!("product '{}': unknown category '{slug}'", product.slug));
            }
        }
    }

    for discount in &seed.discounts {
        let draft = discount
            .scope(&products, &categories)
            .and_then(|scope| {
                let draft = DiscountDraft {
                    scope,
                    name: discount.name.clone(),
                    description: discount.description.clone(),
                    kind: discount.kind,
                    value: discount.value,
                    start_date: discount.start_date,
                    end_date: discount.end_date,
                    priority: discount.priority,
                    is_active: discount.is_active,
                };
                draft
                    .validate()
                    .map_err(|e| format!("discount '{}': {e}", discount.name))
            });
        if let Err(e) = draft {
            errors.push(e);
        }
    }

    for promo in &seed.promo_codes {
        if let Err(e) = promo.validate() {
            errors.push(format!("promo code '{}': {e}", promo.code));
        }
    }

    for zone in &seed.shipping_zones {
        if let Err(e) = zone.validate() {
            errors.push(format!("shipping zone '{}': {e}", zone.name));
        }
    }

    for sale in &seed.sale_promotions {
        if sale.title.trim().is_empty() {
            errors.push("sale promotion: title is required".to_string());
        }
    }

    errors
}

/// Seed the storefront database from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails.
pub async fn run(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    info!("Seed file validated successfully");

    let pool = super::connect().await?;
    let summary = write(&pool, seed).await?;

    info!("Seeding complete!");
    info!("  Categories: {}", summary.categories);
    info!("  Products: {}", summary.products);
    info!("  Discounts: {}", summary.discounts);
    info!("  Promo codes: {}", summary.promo_codes);
    info!("  Shipping zones: {}", summary.shipping_zones);
    info!("  Sale promotions: {}", summary.sale_promotions);

    Ok(())
}

async fn write(
    pool: &sqlx::PgPool,
    seed: SeedFile,
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let catalog = CatalogRepository::new(pool);
    let mut summary = SeedSummary::default();

    let mut categories = HashMap::new();
    for category in seed.categories {
        let id = catalog
            .upsert_category(&Category {
                id: CategoryId::generate(),
                name: category.name.trim().to_string(),
                slug: category.slug.clone(),
            })
            .await?;
        categories.insert(category.slug, id);
        summary.categories += 1;
    }

    let mut products = HashMap::new();
    for product in seed.products {
        let category_ids = product
            .categories
            .iter()
            .filter_map(|slug| categories.get(slug).copied())
            .collect();
        let id = catalog
            .upsert_product(&Product {
                id: ProductId::generate(),
                name: product.name.trim().to_string(),
                slug: product.slug.clone(),
                price: product.price,
                sale_price: product.sale_price,
                stock_quantity: product.stock_quantity,
                sizes: product.sizes,
                category_ids,
                is_active: product.is_active,
            })
            .await?;
        products.insert(product.slug, id);
        summary.products += 1;
    }

    let discounts = DiscountRepository::new(pool);
    let now = Utc::now();
    for discount in seed.discounts {
        let scope = discount.scope(&products, &categories)?;
        let discount = discount
            .into_draft(scope)
            .into_discount(DiscountId::generate(), now)?;
        discounts.insert(&discount).await?;
        summary.discounts += 1;
    }

    let promo_codes = PromoCodeRepository::new(pool);
    for draft in seed.promo_codes {
        promo_codes
            .upsert(&draft.into_promo_code(PromoCodeId::generate())?)
            .await?;
        summary.promo_codes += 1;
    }

    let zones = ShippingZoneRepository::new(pool);
    for draft in seed.shipping_zones {
        zones
            .insert(&draft.into_zone(ShippingZoneId::generate())?)
            .await?;
        summary.shipping_zones += 1;
    }

    let sales = SalePromotionRepository::new(pool);
    for sale in seed.sale_promotions {
        sales
            .insert(&SalePromotion {
                id: SalePromotionId::generate(),
                title: sale.title.trim().to_string(),
                end_date: sale.end_date,
                is_active: sale.is_active,
                created_at: now,
            })
            .await?;
        summary.sale_promotions += 1;
    }

    Ok(summary)
}
