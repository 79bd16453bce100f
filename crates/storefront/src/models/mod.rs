//! Storefront-side records that have no place in the pure core crate.

pub mod order;

pub use order::{
    Customer, NewOrder, Order, OrderItem, PaymentUpdate, PlacedOrder, ShippingAddress,
};
