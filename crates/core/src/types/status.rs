//! Status enums for orders and payments.
//!
//! Statuses are stored as lowercase text in the backing store, so every enum
//! here round-trips through `Display`/`FromStr` with the same spelling serde
//! uses.

use serde::{Deserialize, Serialize};

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct StatusParseError {
    kind: &'static str,
    value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The stored text representation.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = StatusParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(StatusParseError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Paid,
    Shipped,
    Completed,
    Refunded,
    Failed,
    Cancelled,
}

text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Paid => "paid",
    Shipped => "shipped",
    Completed => "completed",
    Refunded => "refunded",
    Failed => "failed",
    Cancelled => "cancelled",
});

/// Payment collection status, tracked separately from fulfilment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
    Failed,
}

text_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Refunded => "refunded",
    Failed => "failed",
});

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Hosted checkout through the Maya payment gateway.
    #[default]
    Maya,
    /// Cash on delivery.
    Cod,
}

text_enum!(PaymentMethod, "payment method", {
    Maya => "maya",
    Cod => "cod",
});

/// Outcome reported by the payment gateway's webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOutcome {
    Paid,
    Failed,
    Cancelled,
    Pending,
}

impl GatewayOutcome {
    /// Map the gateway's checkout `status` and `paymentStatus` strings.
    ///
    /// Either field may signal the outcome; success is checked first, then
    /// failure, then cancellation. Anything else leaves the order pending.
    #[must_use]
    pub fn from_gateway(status: Option<&str>, payment_status: Option<&str>) -> Self {
        match (status, payment_status) {
            (Some("COMPLETED"), _) | (_, Some("PAYMENT_SUCCESS")) => Self::Paid,
            (Some("FAILED"), _) | (_, Some("PAYMENT_FAILED")) => Self::Failed,
            (Some("CANCELLED"), _) | (_, Some("PAYMENT_CANCELLED")) => Self::Cancelled,
            _ => Self::Pending,
        }
    }

    /// The order status this outcome moves an order to.
    #[must_use]
    pub const fn order_status(self) -> OrderStatus {
        match self {
            Self::Paid => OrderStatus::Paid,
            Self::Failed => OrderStatus::Failed,
            Self::Cancelled => OrderStatus::Cancelled,
            Self::Pending => OrderStatus::Pending,
        }
    }
}
