//! Composes line prices, promo discount and shipping into an order total.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::discount::{AppliedDiscount, Discount, TieBreak, resolve_price};
use super::promo::{PromoCode, compute_promo_discount};
use crate::cart::Cart;
use crate::size::SizeValue;
use crate::types::ProductId;
use crate::types::price::round_minor_units;

/// A cart line with its resolved price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: String,
    pub size: Option<SizeValue>,
    pub color: Option<String>,
    pub quantity: u32,
    pub list_price: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub discount: Option<AppliedDiscount>,
}

/// Price every line of a cart at `now`.
#[must_use]
pub fn price_lines(
    cart: &Cart,
    discounts: &[Discount],
    now: DateTime<Utc>,
    tie_break: TieBreak,
) -> Vec<PricedLine> {
    cart.lines()
        .iter()
        .map(|line| {
            let resolved = resolve_price(&line.product, discounts, now, tie_break);
            PricedLine {
                product_id: line.product.id,
                name: line.product.name.clone(),
                size: line.size,
                color: line.color.clone(),
                quantity: line.quantity,
                list_price: resolved.list_price,
                unit_price: resolved.unit_price,
                line_total: round_minor_units(resolved.unit_price * Decimal::from(line.quantity)),
                discount: resolved.discount,
            }
        })
        .collect()
}

/// The amounts charged for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    /// Promo code discount.
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Combine priced lines, an already-validated promo and the shipping fee.
///
/// `total = max(0, subtotal - promo discount) + shipping`, where shipping is
/// zero for a free-shipping code. A code never discounts and waives shipping
/// at once, since a free-shipping code's discount amount is zero.
#[must_use]
pub fn compute_order_total(
    lines: &[PricedLine],
    promo: Option<&PromoCode>,
    shipping_fee: Decimal,
) -> OrderTotals {
    let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
    let discount = promo.map_or(Decimal::ZERO, |p| compute_promo_discount(p, subtotal));
    let shipping = if promo.is_some_and(PromoCode::is_free_shipping) {
        Decimal::ZERO
    } else {
        shipping_fee.max(Decimal::ZERO)
    };
    let total = (subtotal - discount).max(Decimal::ZERO) + shipping;

    OrderTotals {
        subtotal,
        discount,
        shipping,
        total,
    }
}
