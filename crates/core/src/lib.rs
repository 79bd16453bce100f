//! Stride Core - Shared types and the pricing engine.
//!
//! This crate provides the domain types used across all Stride components:
//! - `storefront` - Pricing, checkout and payment-webhook JSON service
//! - `cli` - Command-line tools for migrations, seeding and promo checks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Every resolver takes the current time as an argument
//! so results are reproducible for identical inputs.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, and order/payment statuses
//! - [`catalog`] - Products and categories as the pricing engine sees them
//! - [`size`] - Shoe size scales and the static conversion table
//! - [`cart`] - Explicit cart object keyed by product, size and color
//! - [`pricing`] - Discount, promo code, shipping and order total resolution

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod pricing;
pub mod size;
pub mod types;

pub use types::*;
