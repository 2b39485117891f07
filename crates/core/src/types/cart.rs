//! Cart line items, cart state, and pricing breakdowns.
//!
//! The central invariant of this module: `item_count` and `subtotal` are
//! *derived* from the line items and recomputed on every read. They are
//! never stored, so they can never drift from the items that back them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{LineItemId, ProductId};

/// One product + variant + quantity entry in a cart.
///
/// The same shape is used for guest (locally cached) and remote (server
/// persisted) lines; remote payloads are normalized into this type at the
/// API boundary so nothing downstream branches on where a line came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Stable id for this cart entry (server line id or guest synthetic id).
    pub local_id: LineItemId,
    /// The product this line refers to.
    pub product_id: ProductId,
    /// Product name at the time the line was added.
    pub name: String,
    /// Unit price in the store currency.
    pub unit_price: Decimal,
    /// Quantity, always >= 1. A quantity pushed below 1 removes the line.
    pub quantity: u32,
    /// Selected size variant, if any.
    pub size: Option<String>,
    /// Selected color variant, if any.
    pub color: Option<String>,
    /// Display image reference, if any.
    pub image: Option<String>,
}

impl LineItem {
    /// Line total: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Whether another line refers to the same product variant
    /// (product, size, color). Matching lines merge instead of duplicating.
    #[must_use]
    pub fn same_variant(&self, other: &Self) -> bool {
        self.product_id == other.product_id
            && self.size == other.size
            && self.color == other.color
    }
}

/// The cart a session observes: an ordered sequence of line items.
///
/// Insertion order is preserved. Totals are methods, not fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    /// Line items in insertion order.
    pub items: Vec<LineItem>,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from already-normalized line items.
    #[must_use]
    pub const fn from_items(items: Vec<LineItem>) -> Self {
        Self { items }
    }

    /// Total quantity across all lines. Derived, never stored.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of unit price times quantity across all lines. Derived, never
    /// stored.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find a line by its id.
    #[must_use]
    pub fn find(&self, id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.local_id == id)
    }
}

/// Fully priced cart totals.
///
/// `total = subtotal + shipping_cost + tax_amount - discount_amount`,
/// floored at zero. Tax is computed on the pre-discount shippable amount;
/// the discount comes off after tax. That ordering is a policy choice and
/// is relied on by order submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PricingBreakdown {
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Shipping charge for the selected (or default) method.
    pub shipping_cost: Decimal,
    /// Tax on subtotal + shipping, before discount.
    pub tax_amount: Decimal,
    /// Coupon discount, clamped so the total never goes negative.
    pub discount_amount: Decimal,
    /// Grand total, always >= 0.
    pub total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product: &str, price: i64, quantity: u32) -> LineItem {
        LineItem {
            local_id: LineItemId::generate(),
            product_id: ProductId::new(product),
            name: product.to_string(),
            unit_price: Decimal::new(price, 0),
            quantity,
            size: None,
            color: None,
            image: None,
        }
    }

    #[test]
    fn totals_are_derived_from_items() {
        let cart = CartState::from_items(vec![line("a", 1000, 2), line("b", 250, 3)]);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal(), Decimal::new(2750, 0));
    }

    #[test]
    fn empty_cart_has_zero_totals() {
        let cart = CartState::new();
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.subtotal(), Decimal::ZERO);
        assert!(cart.is_empty());
    }

    #[test]
    fn same_variant_requires_matching_size_and_color() {
        let mut a = line("a", 100, 1);
        let mut b = line("a", 100, 1);
        assert!(a.same_variant(&b));

        a.size = Some("M".to_string());
        assert!(!a.same_variant(&b));

        b.size = Some("M".to_string());
        b.color = Some("red".to_string());
        assert!(!a.same_variant(&b));
    }
}
