//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `pricing` - cached discount, promo and shipping resolution, cart quotes
//! - `checkout` - order placement with server-side re-quoting
//! - `maya` - Maya Checkout API client

pub mod checkout;
pub mod maya;
pub mod pricing;

pub use checkout::{CheckoutError, CheckoutOutcome, CheckoutRequest, CheckoutService};
pub use maya::{CheckoutSession, MayaClient, PaymentError};
pub use pricing::{
    CartItemRequest, PricingService, PromoValidation, Quote, QuoteError, QuoteRequest, SaleBanner,
};
