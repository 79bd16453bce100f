//! Catalog records as the pricing engine sees them.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::size::Size;
use crate::types::{CategoryId, ProductId};

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    /// Base price in pesos.
    pub price: Decimal,
    /// Optional override shown as a strike-through sale.
    pub sale_price: Option<Decimal>,
    pub stock_quantity: u32,
    /// Offered sizes on the EU scale.
    #[serde(default)]
    pub sizes: Vec<Size>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    pub is_active: bool,
}

impl Product {
    /// The sale price, when it actually undercuts the base price.
    #[must_use]
    pub fn effective_sale_price(&self) -> Option<Decimal> {
        self.sale_price
            .filter(|sale| *sale >= Decimal::ZERO && *sale < self.price)
    }

    /// Price before any discount record is considered.
    #[must_use]
    pub fn undiscounted_price(&self) -> Decimal {
        self.effective_sale_price().unwrap_or(self.price)
    }

    /// Whether the product belongs to any of the given categories.
    #[must_use]
    pub fn in_any_category(&self, categories: &[CategoryId]) -> bool {
        self.category_ids.iter().any(|id| categories.contains(id))
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// Whole-number percentage saved by a sale price, for "-20%" badges.
///
/// Returns 0 when there is no sale price or it does not undercut the original.
#[must_use]
pub fn sale_percentage(original: Decimal, sale: Option<Decimal>) -> u32 {
    let Some(sale) = sale else {
        return 0;
    };
    if original <= Decimal::ZERO || sale >= original {
        return 0;
    }
    ((original - sale) / original * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}
