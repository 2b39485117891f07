//! Coupon codes and discount rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a coupon's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CouponKind {
    /// `value` is a fraction of the subtotal (0.10 = 10% off).
    Percentage,
    /// `value` is a flat amount in the store currency.
    FixedAmount,
}

/// A user-entered code mapping to a discount rule.
///
/// Coupons live in session-scoped state. They survive the cart-to-checkout
/// navigation only through the explicit checkout handoff store and are
/// cleared on successful checkout or cart clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// The code as entered (stored uppercased).
    pub code: String,
    /// Percentage or fixed amount.
    pub kind: CouponKind,
    /// Discount value; a fraction for percentage coupons, an amount
    /// otherwise.
    pub value: Decimal,
}

impl Coupon {
    /// Percentage coupon (value is a fraction, e.g. 0.10 for 10%).
    #[must_use]
    pub fn percentage(code: impl Into<String>, value: Decimal) -> Self {
        Self {
            code: code.into().to_uppercase(),
            kind: CouponKind::Percentage,
            value,
        }
    }

    /// Fixed-amount coupon.
    #[must_use]
    pub fn fixed(code: impl Into<String>, value: Decimal) -> Self {
        Self {
            code: code.into().to_uppercase(),
            kind: CouponKind::FixedAmount,
            value,
        }
    }
}
