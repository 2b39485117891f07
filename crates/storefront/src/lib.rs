//! Bazaar Storefront library.
//!
//! The cart core behind the storefront UI: a reconciler that owns the
//! session-visible cart and reads/writes through either the guest cache or
//! the remote backend, a pure pricing engine, and a checkout submitter.
//! Page rendering and navigation are external collaborators and live
//! elsewhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod pricing;
