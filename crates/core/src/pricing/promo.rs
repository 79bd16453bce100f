//! Promo code validation and redemption rules.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DraftError;
use crate::types::price::round_minor_units;
use crate::types::{Price, PromoCodeId};

/// The `discount_type` column of a promo code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoType {
    Percentage,
    FixedAmount,
    FreeShipping,
}

impl PromoType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
            Self::FreeShipping => "free_shipping",
        }
    }
}

impl FromStr for PromoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed_amount" => Ok(Self::FixedAmount),
            "free_shipping" => Ok(Self::FreeShipping),
            other => Err(format!("unknown promo type '{other}'")),
        }
    }
}

/// What a promo code gives the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "discount_type", content = "discount_value", rename_all = "snake_case")]
pub enum PromoKind {
    /// Percent off the subtotal.
    Percentage(Decimal),
    /// Pesos off the subtotal.
    FixedAmount(Decimal),
    /// Waives the shipping fee; the subtotal is untouched.
    FreeShipping,
}

impl PromoKind {
    /// Build from the stored `discount_type` and nullable `discount_value`.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::MissingValue`] when a percentage or fixed code
    /// has no value.
    pub fn from_parts(kind: PromoType, value: Option<Decimal>) -> Result<Self, DraftError> {
        match (kind, value) {
            (PromoType::FreeShipping, _) => Ok(Self::FreeShipping),
            (PromoType::Percentage, Some(v)) => Ok(Self::Percentage(v)),
            (PromoType::FixedAmount, Some(v)) => Ok(Self::FixedAmount(v)),
            (_, None) => Err(DraftError::MissingValue),
        }
    }

    #[must_use]
    pub const fn promo_type(&self) -> PromoType {
        match self {
            Self::Percentage(_) => PromoType::Percentage,
            Self::FixedAmount(_) => PromoType::FixedAmount,
            Self::FreeShipping => PromoType::FreeShipping,
        }
    }

    #[must_use]
    pub const fn value(&self) -> Option<Decimal> {
        match self {
            Self::Percentage(v) | Self::FixedAmount(v) => Some(*v),
            Self::FreeShipping => None,
        }
    }
}

/// A promo code record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: PromoCodeId,
    /// Always stored uppercase.
    pub code: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: PromoKind,
    pub min_order_amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// `None` means unlimited.
    pub usage_limit: Option<u32>,
    pub times_used: u32,
    pub is_active: bool,
}

impl PromoCode {
    #[must_use]
    pub const fn is_free_shipping(&self) -> bool {
        matches!(self.kind, PromoKind::FreeShipping)
    }

    /// Whether the usage counter still has room.
    #[must_use]
    pub fn can_redeem(&self) -> bool {
        self.usage_limit.is_none_or(|limit| self.times_used < limit)
    }

    /// Count one use if the limit allows it. Returns false when exhausted.
    pub fn redeem(&mut self) -> bool {
        if !self.can_redeem() {
            return false;
        }
        self.times_used = self.times_used.saturating_add(1);
        true
    }
}

/// Trim and uppercase a code as typed by the shopper.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Case-insensitive lookup.
#[must_use]
pub fn find_promo_code<'a>(codes: &'a [PromoCode], code: &str) -> Option<&'a PromoCode> {
    let wanted = normalize_code(code);
    codes.iter().find(|promo| promo.code.to_uppercase() == wanted)
}

/// Coarse reason category for a rejected code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    NotFound,
    Inactive,
    LimitExceeded,
    BelowMinimum,
}

/// Why a promo code cannot be used. The `Display` text is shown to shoppers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PromoRejection {
    #[error("Invalid or expired promo code")]
    NotFound,

    #[error("This promo code is no longer active")]
    Inactive,

    #[error("This promo code is not yet active")]
    NotYetActive,

    #[error("This promo code has expired")]
    Expired,

    #[error("This promo code has reached its usage limit")]
    UsageLimitReached,

    #[error("Minimum order amount of {} required", peso(.min))]
    BelowMinimum { min: Decimal },
}

fn peso(amount: &Decimal) -> String {
    Price::php(*amount).display()
}

impl PromoRejection {
    #[must_use]
    pub const fn kind(&self) -> RejectionKind {
        match self {
            Self::NotFound => RejectionKind::NotFound,
            Self::Inactive | Self::NotYetActive | Self::Expired => RejectionKind::Inactive,
            Self::UsageLimitReached => RejectionKind::LimitExceeded,
            Self::BelowMinimum { .. } => RejectionKind::BelowMinimum,
        }
    }
}

/// Check whether a looked-up code may be applied to an order.
///
/// Checks run in a fixed order and the first failure is returned. Validation
/// never counts a use; see [`PromoCode::redeem`].
///
/// # Errors
///
/// Returns the [`PromoRejection`] for the first failing check.
pub fn validate_promo_code(
    found: Option<&PromoCode>,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<&PromoCode, PromoRejection> {
    let promo = found.ok_or(PromoRejection::NotFound)?;
    if !promo.is_active {
        return Err(PromoRejection::Inactive);
    }
    if now < promo.start_date {
        return Err(PromoRejection::NotYetActive);
    }
    if now > promo.end_date {
        return Err(PromoRejection::Expired);
    }
    if !promo.can_redeem() {
        return Err(PromoRejection::UsageLimitReached);
    }
    if subtotal < promo.min_order_amount {
        return Err(PromoRejection::BelowMinimum {
            min: promo.min_order_amount,
        });
    }
    Ok(promo)
}

/// Amount a valid code takes off the subtotal, never more than the subtotal.
#[must_use]
pub fn compute_promo_discount(promo: &PromoCode, subtotal: Decimal) -> Decimal {
    let subtotal = subtotal.max(Decimal::ZERO);
    let amount = match promo.kind {
        PromoKind::Percentage(pct) => round_minor_units(subtotal * pct / Decimal::ONE_HUNDRED),
        PromoKind::FixedAmount(value) => value,
        PromoKind::FreeShipping => Decimal::ZERO,
    };
    amount.clamp(Decimal::ZERO, subtotal)
}

/// Promo code fields as entered in the admin form, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCodeDraft {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount_type: PromoType,
    #[serde(default)]
    pub discount_value: Option<Decimal>,
    #[serde(default)]
    pub min_order_amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

impl PromoCodeDraft {
    /// Check the draft and return the normalized code and kind.
    ///
    /// # Errors
    ///
    /// Returns the first rule the draft breaks.
    pub fn validate(&self) -> Result<(String, PromoKind), DraftError> {
        let code = normalize_code(&self.code);
        let len = code.chars().count();
        if !(3..=20).contains(&len) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DraftError::InvalidCode(self.code.clone()));
        }

        let kind = PromoKind::from_parts(self.discount_type, self.discount_value)?;
        if let Some(value) = kind.value() {
            if value <= Decimal::ZERO {
                return Err(DraftError::NonPositiveValue);
            }
            if matches!(kind, PromoKind::Percentage(_)) && value > Decimal::ONE_HUNDRED {
                return Err(DraftError::PercentageOutOfRange);
            }
        }
        if self.min_order_amount < Decimal::ZERO {
            return Err(DraftError::Negative("minimum order amount"));
        }
        if self.usage_limit == Some(0) {
            return Err(DraftError::UsageLimitTooLow);
        }
        if self.end_date < self.start_date {
            return Err(DraftError::InvalidWindow);
        }
        Ok((code, kind))
    }

    /// Validate and turn the draft into a fresh, unused promo code.
    ///
    /// # Errors
    ///
    /// Returns the first rule the draft breaks.
    pub fn into_promo_code(self, id: PromoCodeId) -> Result<PromoCode, DraftError> {
        let (code, kind) = self.validate()?;
        Ok(PromoCode {
            id,
            code,
            description: self.description,
            kind,
            min_order_amount: self.min_order_amount,
            start_date: self.start_date,
            end_date: self.end_date,
            usage_limit: self.usage_limit,
            times_used: 0,
            is_active: self.is_active,
        })
    }
}
