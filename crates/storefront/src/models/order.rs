//! Order records created by checkout and updated by the payment webhook.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stride_core::pricing::{OrderTotals, PricedLine};
use stride_core::size::SizeValue;
use stride_core::{GatewayOutcome, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId};

/// Who placed the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Where the order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// A purchased line, frozen at the price charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub size: Option<SizeValue>,
    pub color: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<&PricedLine> for OrderItem {
    fn from(line: &PricedLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            size: line.size,
            color: line.color.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
        }
    }
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Client-supplied idempotency key.
    pub reference: Uuid,
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub promo_code: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub payment_receipt: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to insert an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: OrderId,
    pub reference: Uuid,
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    /// Normalized code to redeem together with the insert.
    pub promo_code: Option<String>,
    pub payment_method: PaymentMethod,
}

impl NewOrder {
    /// The order as it will be stored, with pending statuses.
    #[must_use]
    pub fn into_order(self, now: DateTime<Utc>) -> Order {
        Order {
            id: self.id,
            reference: self.reference,
            customer: self.customer,
            shipping_address: self.shipping_address,
            items: self.items,
            subtotal: self.totals.subtotal,
            discount: self.totals.discount,
            shipping_fee: self.totals.shipping,
            total: self.totals.total,
            promo_code: self.promo_code,
            status: OrderStatus::Pending,
            payment_method: self.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            payment_receipt: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    /// True when the reference was already used and the existing order was returned.
    pub replayed: bool,
}

/// Payment details reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUpdate {
    pub status: OrderStatus,
    /// `None` leaves the payment status unchanged.
    pub payment_status: Option<PaymentStatus>,
    pub payment_reference: Option<String>,
    pub payment_receipt: Option<serde_json::Value>,
}

impl PaymentUpdate {
    #[must_use]
    pub fn from_outcome(
        outcome: GatewayOutcome,
        payment_reference: Option<String>,
        payment_receipt: Option<serde_json::Value>,
    ) -> Self {
        let payment_status = match outcome {
            GatewayOutcome::Paid => Some(PaymentStatus::Paid),
            GatewayOutcome::Failed => Some(PaymentStatus::Failed),
            GatewayOutcome::Cancelled | GatewayOutcome::Pending => None,
        };
        Self {
            status: outcome.order_status(),
            payment_status,
            payment_reference,
            payment_receipt,
        }
    }

    /// Whether the update may change `order`. A paid order only accepts
    /// another payment, so a late pending or cancelled notification cannot
    /// move it back.
    #[must_use]
    pub fn applies_to(&self, order: &Order) -> bool {
        order.payment_status != PaymentStatus::Paid
            || self.payment_status == Some(PaymentStatus::Paid)
    }

    /// Apply the update to an order in memory. Returns false, leaving the
    /// order untouched, when [`Self::applies_to`] refuses it.
    pub fn apply(&self, order: &mut Order, now: DateTime<Utc>) -> bool {
        if !self.applies_to(order) {
            return false;
        }
        order.status = self.status;
        if let Some(payment_status) = self.payment_status {
            order.payment_status = payment_status;
        }
        if self.payment_reference.is_some() {
            order.payment_reference.clone_from(&self.payment_reference);
        }
        if self.payment_receipt.is_some() {
            order.payment_receipt.clone_from(&self.payment_receipt);
        }
        order.updated_at = now;
        true
    }
}
