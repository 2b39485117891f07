//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod coupon;
pub mod id;
pub mod price;
pub mod session;

pub use cart::{CartState, LineItem, PricingBreakdown};
pub use coupon::{Coupon, CouponKind};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use session::{AuthMode, UserProfile};
