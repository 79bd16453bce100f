//! Time-windowed product and category discounts.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DraftError;
use crate::catalog::Product;
use crate::types::price::round_minor_units;
use crate::types::{CategoryId, DiscountId, ProductId};

/// How a discount changes the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` percent off.
    Percentage,
    /// `value` pesos off.
    FixedAmount,
}

impl DiscountKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
        }
    }
}

impl FromStr for DiscountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed_amount" => Ok(Self::FixedAmount),
            other => Err(format!("unknown discount type '{other}'")),
        }
    }
}

/// Which products a discount targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "application_type", content = "ids", rename_all = "snake_case")]
pub enum DiscountScope {
    /// Linked to specific products.
    Manual(Vec<ProductId>),
    /// Applies to every product in any of these categories.
    Category(Vec<CategoryId>),
}

impl DiscountScope {
    #[must_use]
    pub const fn is_manual(&self) -> bool {
        matches!(self, Self::Manual(_))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Manual(ids) => ids.is_empty(),
            Self::Category(ids) => ids.is_empty(),
        }
    }
}

/// A discount record authored in the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub name: String,
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub scope: DiscountScope,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Higher wins.
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Discount {
    /// Enabled and `now` within `[start_date, end_date]`, both ends inclusive.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    /// Whether the discount targets this product, ignoring the time window.
    #[must_use]
    pub fn applies_to(&self, product: &Product) -> bool {
        match &self.scope {
            DiscountScope::Manual(ids) => ids.contains(&product.id),
            DiscountScope::Category(ids) => product.in_any_category(ids),
        }
    }
}

/// Rule for choosing between active discounts with the same priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The first candidate in the order given, with manual links ahead of
    /// category discounts.
    FirstFound,
    /// The most recently created discount, then the smallest id.
    #[default]
    HighestPriorityThenNewest,
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "first_found" => Ok(Self::FirstFound),
            "highest_priority_then_newest" => Ok(Self::HighestPriorityThenNewest),
            other => Err(format!(
                "unknown tie-break '{other}', expected first_found or highest_priority_then_newest"
            )),
        }
    }
}

/// Discounts that target the product: manual links first, then category matches.
fn candidates<'a>(
    product: &'a Product,
    discounts: &'a [Discount],
) -> impl Iterator<Item = &'a Discount> {
    let manual = discounts
        .iter()
        .filter(|d| d.scope.is_manual() && d.applies_to(product));
    let by_category = discounts
        .iter()
        .filter(|d| !d.scope.is_manual() && d.applies_to(product));
    manual.chain(by_category)
}

/// Find the single discount that applies to `product` at `now`.
#[must_use]
pub fn resolve_active_discount<'a>(
    product: &'a Product,
    discounts: &'a [Discount],
    now: DateTime<Utc>,
    tie_break: TieBreak,
) -> Option<&'a Discount> {
    let mut active = candidates(product, discounts).filter(|d| d.is_active_at(now));

    match tie_break {
        TieBreak::FirstFound => active.fold(None, |best: Option<&Discount>, d| match best {
            Some(best) if best.priority >= d.priority => Some(best),
            _ => Some(d),
        }),
        TieBreak::HighestPriorityThenNewest => active.max_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(b.id.cmp(&a.id))
        }),
    }
}

/// Apply a discount to a price, never going below zero.
#[must_use]
pub fn apply_discount(price: Decimal, discount: &Discount) -> Decimal {
    let reduced = match discount.kind {
        DiscountKind::Percentage => price - price * discount.value / Decimal::ONE_HUNDRED,
        DiscountKind::FixedAmount => price - discount.value,
    };
    reduced.max(Decimal::ZERO)
}

/// Where a resolved unit price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Discount,
    SalePrice,
    List,
}

/// Summary of the discount that won resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub id: DiscountId,
    pub name: String,
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl From<&Discount> for AppliedDiscount {
    fn from(discount: &Discount) -> Self {
        Self {
            id: discount.id,
            name: discount.name.clone(),
            kind: discount.kind,
            value: discount.value,
        }
    }
}

/// The price a shopper pays for one unit of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub product_id: ProductId,
    /// The product's base price.
    pub list_price: Decimal,
    /// What one unit costs after resolution, in whole centavos.
    pub unit_price: Decimal,
    pub discount: Option<AppliedDiscount>,
    pub source: PriceSource,
}

impl ResolvedPrice {
    /// Pesos saved against the list price.
    #[must_use]
    pub fn savings(&self) -> Decimal {
        (self.list_price - self.unit_price).max(Decimal::ZERO)
    }
}

/// Resolve a product's unit price.
///
/// An active discount is applied to the base price and takes precedence over
/// the product's own sale price, which is only a fallback.
#[must_use]
pub fn resolve_price(
    product: &Product,
    discounts: &[Discount],
    now: DateTime<Utc>,
    tie_break: TieBreak,
) -> ResolvedPrice {
    let winner = resolve_active_discount(product, discounts, now, tie_break);
    let (unit_price, source) = match (winner, product.effective_sale_price()) {
        (Some(discount), _) => (apply_discount(product.price, discount), PriceSource::Discount),
        (None, Some(sale)) => (sale, PriceSource::SalePrice),
        (None, None) => (product.price, PriceSource::List),
    };

    ResolvedPrice {
        product_id: product.id,
        list_price: product.price,
        unit_price: round_minor_units(unit_price),
        discount: winner.map(AppliedDiscount::from),
        source,
    }
}

/// Resolve prices for a product listing in one pass.
#[must_use]
pub fn resolve_prices(
    products: &[Product],
    discounts: &[Discount],
    now: DateTime<Utc>,
    tie_break: TieBreak,
) -> Vec<ResolvedPrice> {
    products
        .iter()
        .map(|product| resolve_price(product, discounts, now, tie_break))
        .collect()
}

/// Discount fields as entered in the admin form, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub scope: DiscountScope,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

impl DiscountDraft {
    /// Check the draft against the admin form's rules.
    ///
    /// # Errors
    ///
    /// Returns the first rule the draft breaks.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.name.trim().chars().count() < 3 {
            return Err(DraftError::NameTooShort { min: 3 });
        }
        if self.value <= Decimal::ZERO {
            return Err(DraftError::NonPositiveValue);
        }
        if self.kind == DiscountKind::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(DraftError::PercentageOutOfRange);
        }
        if self.scope.is_empty() {
            return Err(DraftError::EmptyScope);
        }
        if self.end_date < self.start_date {
            return Err(DraftError::InvalidWindow);
        }
        Ok(())
    }

    /// Validate and turn the draft into a stored discount.
    ///
    /// # Errors
    ///
    /// Returns the first rule the draft breaks.
    pub fn into_discount(
        self,
        id: DiscountId,
        created_at: DateTime<Utc>,
    ) -> Result<Discount, DraftError> {
        self.validate()?;
        Ok(Discount {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            kind: self.kind,
            value: self.value,
            scope: self.scope,
            start_date: self.start_date,
            end_date: self.end_date,
            priority: self.priority,
            is_active: self.is_active,
            created_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn product(categories: Vec<CategoryId>) -> Product {
        Product {
            id: ProductId::generate(),
            name: "Trail Runner".to_string(),
            slug: "trail-runner".to_string(),
            price: Decimal::from(1000),
            sale_price: None,
            stock_quantity: 5,
            sizes: Vec::new(),
            category_ids: categories,
            is_active: true,
        }
    }

    fn discount(scope: DiscountScope, kind: DiscountKind, value: i64, priority: i32) -> Discount {
        Discount {
            id: DiscountId::generate(),
            name: format!("{value} off"),
            description: None,
            kind,
            value: Decimal::from(value),
            scope,
            start_date: now() - Duration::days(1),
            end_date: now() + Duration::days(1),
            priority,
            is_active: true,
            created_at: now() - Duration::days(7),
        }
    }

    #[test]
    fn test_highest_priority_wins_regardless_of_order() {
        let p = product(vec![]);
        let low = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 5, 5);
        let high = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 10, 10);

        for tie_break in [TieBreak::FirstFound, TieBreak::HighestPriorityThenNewest] {
            let forward = [low.clone(), high.clone()];
            let backward = [high.clone(), low.clone()];
            assert_eq!(
                resolve_active_discount(&p, &forward, now(), tie_break).unwrap().id,
                high.id
            );
            assert_eq!(
                resolve_active_discount(&p, &backward, now(), tie_break).unwrap().id,
                high.id
            );
        }
    }

    #[test]
    fn test_window_is_inclusive_at_both_ends() {
        let p = product(vec![]);
        let mut d = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 10, 1);
        d.start_date = now();
        d.end_date = now();
        assert!(d.is_active_at(now()));
        assert!(resolve_active_discount(&p, std::slice::from_ref(&d), now(), TieBreak::default()).is_some());
    }

    #[test]
    fn test_expired_by_one_millisecond() {
        let p = product(vec![]);
        let mut d = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 10, 1);
        d.end_date = now() - Duration::milliseconds(1);
        assert!(!d.is_active_at(now()));
        assert!(resolve_active_discount(&p, &[d], now(), TieBreak::default()).is_none());
    }

    #[test]
    fn test_inactive_and_future_discounts_ignored() {
        let p = product(vec![]);
        let mut disabled = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 10, 9);
        disabled.is_active = false;
        let mut future = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 10, 9);
        future.start_date = now() + Duration::hours(1);
        assert!(resolve_active_discount(&p, &[disabled, future], now(), TieBreak::default()).is_none());
    }

    #[test]
    fn test_product_without_categories_never_matches_category_discount() {
        let p = product(vec![]);
        let d = discount(
            DiscountScope::Category(vec![CategoryId::generate()]),
            DiscountKind::Percentage,
            20,
            1,
        );
        assert!(resolve_active_discount(&p, &[d], now(), TieBreak::default()).is_none());
    }

    #[test]
    fn test_category_discount_matches_on_intersection() {
        let sneakers = CategoryId::generate();
        let p = product(vec![CategoryId::generate(), sneakers]);
        let d = discount(DiscountScope::Category(vec![sneakers]), DiscountKind::Percentage, 20, 1);
        let resolved = resolve_price(&p, std::slice::from_ref(&d), now(), TieBreak::default());
        assert_eq!(resolved.unit_price, Decimal::from(800));
        assert_eq!(resolved.source, PriceSource::Discount);
        assert_eq!(resolved.discount.as_ref().unwrap().id, d.id);
        assert_eq!(resolved.savings(), Decimal::from(200));
    }

    #[test]
    fn test_first_found_prefers_manual_then_input_order() {
        let sneakers = CategoryId::generate();
        let p = product(vec![sneakers]);
        let category = discount(DiscountScope::Category(vec![sneakers]), DiscountKind::Percentage, 20, 3);
        let manual_a = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 10, 3);
        let manual_b = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 15, 3);
        let all = [category, manual_a.clone(), manual_b];
        let winner = resolve_active_discount(&p, &all, now(), TieBreak::FirstFound).unwrap();
        assert_eq!(winner.id, manual_a.id);
    }

    #[test]
    fn test_newest_breaks_ties_independent_of_order() {
        let p = product(vec![]);
        let older = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 10, 3);
        let mut newer = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 15, 3);
        newer.created_at = older.created_at + Duration::hours(1);

        let forward = [older.clone(), newer.clone()];
        let backward = [newer.clone(), older];
        for list in [&forward[..], &backward[..]] {
            let winner =
                resolve_active_discount(&p, list, now(), TieBreak::HighestPriorityThenNewest).unwrap();
            assert_eq!(winner.id, newer.id);
        }
    }

    #[test]
    fn test_apply_discount_clamps_at_zero() {
        let p = product(vec![]);
        let fixed = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::FixedAmount, 1500, 1);
        let pct = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 100, 1);
        assert_eq!(apply_discount(Decimal::from(1000), &fixed), Decimal::ZERO);
        assert_eq!(apply_discount(Decimal::from(1000), &pct), Decimal::ZERO);
        assert_eq!(apply_discount(Decimal::ZERO, &fixed), Decimal::ZERO);
    }

    #[test]
    fn test_no_discount_falls_back_to_sale_then_list() {
        let mut p = product(vec![]);
        p.sale_price = Some(Decimal::from(900));
        let sale = resolve_price(&p, &[], now(), TieBreak::default());
        assert_eq!(sale.unit_price, Decimal::from(900));
        assert_eq!(sale.source, PriceSource::SalePrice);

        p.sale_price = None;
        let list = resolve_price(&p, &[], now(), TieBreak::default());
        assert_eq!(list.unit_price, Decimal::from(1000));
        assert_eq!(list.source, PriceSource::List);
    }

    #[test]
    fn test_discount_overrides_sale_price() {
        let mut p = product(vec![]);
        p.sale_price = Some(Decimal::from(700));
        let d = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 10, 1);
        let resolved = resolve_price(&p, &[d], now(), TieBreak::default());
        assert_eq!(resolved.unit_price, Decimal::from(900));
    }

    #[test]
    fn test_unit_price_rounded_to_centavos() {
        let mut p = product(vec![]);
        p.price = Decimal::from(999);
        let d = discount(DiscountScope::Manual(vec![p.id]), DiscountKind::Percentage, 15, 1);
        // 999 * 0.85 = 849.15
        assert_eq!(
            resolve_price(&p, &[d], now(), TieBreak::default()).unit_price,
            Decimal::new(84915, 2)
        );
    }

    #[test]
    fn test_draft_validation() {
        let draft = DiscountDraft {
            name: "Summer".to_string(),
            description: None,
            kind: DiscountKind::Percentage,
            value: Decimal::from(120),
            scope: DiscountScope::Category(vec![CategoryId::generate()]),
            start_date: now(),
            end_date: now() + Duration::days(3),
            priority: 1,
            is_active: true,
        };
        assert_eq!(draft.validate(), Err(DraftError::PercentageOutOfRange));

        let empty = DiscountDraft {
            value: Decimal::from(20),
            scope: DiscountScope::Manual(vec![]),
            ..draft.clone()
        };
        assert_eq!(empty.validate(), Err(DraftError::EmptyScope));

        let backwards = DiscountDraft {
            value: Decimal::from(20),
            end_date: now() - Duration::days(1),
            ..draft.clone()
        };
        assert_eq!(backwards.validate(), Err(DraftError::InvalidWindow));

        let ok = DiscountDraft {
            value: Decimal::from(20),
            ..draft
        };
        let stored = ok.into_discount(DiscountId::generate(), now()).unwrap();
        assert_eq!(stored.name, "Summer");
    }

    #[test]
    fn test_tie_break_parse() {
        assert_eq!("first_found".parse::<TieBreak>().unwrap(), TieBreak::FirstFound);
        assert!("random".parse::<TieBreak>().is_err());
    }
}
