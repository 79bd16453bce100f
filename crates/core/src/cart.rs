//! Shopping cart.
//!
//! A cart holds copies of product records plus the shopper's choices. Lines
//! are keyed by product, size and colour; adding the same combination again
//! bumps the quantity instead of adding a second line.

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::size::SizeValue;
use crate::types::ProductId;

/// Identifies one line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: Option<SizeValue>,
    pub color: Option<String>,
}

/// A product in the cart with the shopper's selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub size: Option<SizeValue>,
    pub color: Option<String>,
}

impl CartLine {
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product.id,
            size: self.size,
            color: self.color.clone(),
        }
    }

    fn has_key(&self, key: &LineKey) -> bool {
        self.product.id == key.product_id && self.size == key.size && self.color == key.color
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add a product, merging with an existing line for the same selection.
    /// Quantities below 1 are treated as 1.
    pub fn add_item(
        &mut self,
        product: Product,
        quantity: u32,
        size: Option<SizeValue>,
        color: Option<String>,
    ) {
        let quantity = quantity.max(1);
        let key = LineKey {
            product_id: product.id,
            size,
            color,
        };
        if let Some(line) = self.lines.iter_mut().find(|l| l.has_key(&key)) {
            line.quantity = line.quantity.saturating_add(quantity);
            return;
        }
        self.lines.push(CartLine {
            product,
            quantity,
            size: key.size,
            color: key.color,
        });
    }

    /// Set a line's quantity, never below 1. Returns false if the line is missing.
    pub fn update_quantity(&mut self, key: &LineKey, quantity: u32) -> bool {
        match self.lines.iter_mut().find(|l| l.has_key(key)) {
            Some(line) => {
                line.quantity = quantity.max(1);
                true
            }
            None => false,
        }
    }

    /// Change a line's size. If the cart already has a line for the new
    /// selection the two are merged.
    pub fn update_size(&mut self, key: &LineKey, size: Option<SizeValue>) -> bool {
        let Some(index) = self.lines.iter().position(|l| l.has_key(key)) else {
            return false;
        };
        let target = LineKey {
            size,
            ..key.clone()
        };
        if target == *key {
            return true;
        }
        if let Some(existing) = self.lines.iter().position(|l| l.has_key(&target)) {
            let moved = self.lines.remove(index).quantity;
            let existing = if existing > index { existing - 1 } else { existing };
            let line = &mut self.lines[existing];
            line.quantity = line.quantity.saturating_add(moved);
        } else {
            self.lines[index].size = size;
        }
        true
    }

    pub fn remove_line(&mut self, key: &LineKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| !l.has_key(key));
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }
}
