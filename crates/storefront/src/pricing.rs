//! Pure pricing computation: shipping tiers, GST, and coupon discounts.
//!
//! Nothing in this module performs I/O or holds mutable state. Given the
//! same line items, policy, and coupon, [`price`] always produces the same
//! [`PricingBreakdown`].
//!
//! Ordering policy (deliberate, relied on by order submission): tax is
//! computed on the pre-discount shippable amount, and the discount comes
//! off after tax. Percentage coupons apply to the subtotal only, never to
//! shipping.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{Coupon, LineItem, PricingBreakdown};

/// Free-shipping threshold and the flat rate charged below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Subtotal at or above which shipping is free.
    pub free_threshold: Decimal,
    /// Flat shipping rate below the threshold.
    pub flat_rate: Decimal,
}

impl ShippingPolicy {
    /// Shipping cost for the given subtotal under this policy.
    #[must_use]
    pub fn cost_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            self.flat_rate
        }
    }
}

/// Price a cart: subtotal, shipping tier, tax, clamped discount, total.
///
/// Empty items produce an all-zero breakdown. The discount is clamped to
/// `[0, subtotal + shipping]` so it never exceeds the pre-tax payable
/// amount, and the total is floored at zero.
#[must_use]
pub fn price(
    items: &[LineItem],
    policy: &ShippingPolicy,
    tax_rate: Decimal,
    coupon: Option<&Coupon>,
) -> PricingBreakdown {
    if items.is_empty() {
        return PricingBreakdown::default();
    }

    let subtotal: Decimal = items.iter().map(LineItem::line_total).sum();
    let shipping_cost = policy.cost_for(subtotal);

    let raw_discount = coupon.map_or(Decimal::ZERO, |coupon| match coupon.kind {
        bazaar_core::CouponKind::Percentage => subtotal * coupon.value,
        bazaar_core::CouponKind::FixedAmount => coupon.value,
    });
    let discount_amount = raw_discount
        .max(Decimal::ZERO)
        .min(subtotal + shipping_cost);

    let tax_amount = (subtotal + shipping_cost) * tax_rate;
    let total = (subtotal + shipping_cost + tax_amount - discount_amount).max(Decimal::ZERO);

    PricingBreakdown {
        subtotal,
        shipping_cost,
        tax_amount,
        discount_amount,
        total,
    }
}

/// Result of trying to apply a coupon code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponApplication {
    /// The code matched a rule; carry this coupon into pricing.
    Applied(Coupon),
    /// Unknown code. The discount stays zero and the UI says so; the code
    /// is never silently swallowed.
    NotApplied,
}

/// The store's coupon catalog: code to discount rule.
#[derive(Debug, Clone)]
pub struct CouponBook {
    codes: HashMap<String, Coupon>,
}

impl CouponBook {
    /// An empty coupon book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            codes: HashMap::new(),
        }
    }

    /// Add a coupon, keyed by its (uppercased) code.
    pub fn insert(&mut self, coupon: Coupon) {
        self.codes.insert(coupon.code.clone(), coupon);
    }

    /// Look up a code, case-insensitively.
    #[must_use]
    pub fn apply(&self, code: &str) -> CouponApplication {
        let code = code.trim().to_uppercase();
        self.codes.get(&code).map_or(CouponApplication::NotApplied, |coupon| {
            CouponApplication::Applied(coupon.clone())
        })
    }
}

impl Default for CouponBook {
    /// The store's live catalog: `PAK10` (10% off), `PAK500` (Rs. 500
    /// off), `WELCOME` (20% off for new customers).
    fn default() -> Self {
        let mut book = Self::new();
        book.insert(Coupon::percentage("PAK10", Decimal::new(10, 2)));
        book.insert(Coupon::fixed("PAK500", Decimal::new(500, 0)));
        book.insert(Coupon::percentage("WELCOME", Decimal::new(20, 2)));
        book
    }
}

/// A selectable delivery option shown at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingMethod {
    /// Stable identifier ("standard", "express", "free").
    pub id: String,
    /// Display name.
    pub name: String,
    /// Cost of this method.
    pub cost: Decimal,
    /// Delivery window shown to the user.
    pub days: String,
    /// Carrier handling this method.
    pub provider: String,
    /// Minimum subtotal required, if the method is gated.
    pub min_order: Option<Decimal>,
}

impl ShippingMethod {
    /// Whether a cart with the given subtotal may select this method.
    #[must_use]
    pub fn eligible(&self, subtotal: Decimal) -> bool {
        self.min_order.is_none_or(|min| subtotal >= min)
    }
}

/// The delivery options offered at checkout.
#[must_use]
pub fn shipping_methods() -> Vec<ShippingMethod> {
    vec![
        ShippingMethod {
            id: "standard".to_string(),
            name: "Standard Delivery".to_string(),
            cost: Decimal::new(200, 0),
            days: "5-7 business days".to_string(),
            provider: "Pakistan Post".to_string(),
            min_order: None,
        },
        ShippingMethod {
            id: "express".to_string(),
            name: "Express Delivery".to_string(),
            cost: Decimal::new(500, 0),
            days: "2-3 business days".to_string(),
            provider: "TCS/Leopards".to_string(),
            min_order: None,
        },
        ShippingMethod {
            id: "free".to_string(),
            name: "Free Delivery".to_string(),
            cost: Decimal::ZERO,
            days: "7-10 business days".to_string(),
            provider: "Pakistan Post".to_string(),
            min_order: Some(Decimal::new(5000, 0)),
        },
    ]
}

/// Default method for a given subtotal: free delivery when eligible,
/// otherwise standard.
#[must_use]
pub fn default_shipping_method(subtotal: Decimal) -> ShippingMethod {
    let methods = shipping_methods();
    methods
        .iter()
        .find(|method| method.id == "free" && method.eligible(subtotal))
        .or_else(|| methods.iter().find(|method| method.id == "standard"))
        .cloned()
        .unwrap_or_else(|| ShippingMethod {
            id: "standard".to_string(),
            name: "Standard Delivery".to_string(),
            cost: Decimal::new(200, 0),
            days: "5-7 business days".to_string(),
            provider: "Pakistan Post".to_string(),
            min_order: None,
        })
}
