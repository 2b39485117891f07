//! Bazaar Core - Shared types library.
//!
//! This crate provides common types used across all Bazaar components:
//! - `storefront` - cart reconciliation, pricing, and checkout core
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, line items, cart state, coupons, and
//!   pricing breakdowns

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
