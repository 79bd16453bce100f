//! Pricing resolution.
//!
//! Everything in this module is pure: callers pass the records and the
//! current time in, and get deterministic answers back. "Nothing applies" is
//! never an error; the resolvers return `None`, a rejection reason, or a
//! fallback quote instead.

pub mod discount;
pub mod order;
pub mod promo;
pub mod sale;
pub mod shipping;

pub use discount::{
    AppliedDiscount, Discount, DiscountDraft, DiscountKind, DiscountScope, PriceSource,
    ResolvedPrice, TieBreak, apply_discount, resolve_active_discount, resolve_price,
    resolve_prices,
};
pub use order::{OrderTotals, PricedLine, compute_order_total, price_lines};
pub use promo::{
    PromoCode, PromoCodeDraft, PromoKind, PromoRejection, PromoType, RejectionKind,
    compute_promo_discount, find_promo_code, normalize_code, validate_promo_code,
};
pub use sale::{Countdown, SalePromotion, active_sale_promotion};
pub use shipping::{
    DEFAULT_SHIPPING_FEE, ShippingBasis, ShippingQuote, ShippingZone, ShippingZoneDraft,
    resolve_shipping_fee,
};

/// Validation errors for admin-authored pricing records.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("name must be at least {min} characters")]
    NameTooShort { min: usize },

    #[error("value must be greater than 0")]
    NonPositiveValue,

    #[error("percentage cannot exceed 100")]
    PercentageOutOfRange,

    #[error("value is required unless the code grants free shipping")]
    MissingValue,

    #[error("select at least one product or category")]
    EmptyScope,

    #[error("end date must not be before the start date")]
    InvalidWindow,

    #[error("code must be 3-20 letters or digits, got '{0}'")]
    InvalidCode(String),

    #[error("{0} cannot be negative")]
    Negative(&'static str),

    #[error("usage limit must be at least 1")]
    UsageLimitTooLow,

    #[error("add at least one city")]
    NoCities,
}
