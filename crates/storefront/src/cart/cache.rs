//! Guest-side persistence: the cached guest cart and the short-lived
//! checkout handoff.
//!
//! Both entries are opaque JSON blobs under fixed string keys with no
//! versioning. Absent or unparsable data always reads as "nothing cached";
//! corruption is never an error the caller has to handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use bazaar_core::LineItem;

/// Fixed key for the guest cart blob.
pub const GUEST_CART_KEY: &str = "guestCart";

/// Fixed key for the cart-to-checkout handoff blob.
pub const CHECKOUT_HANDOFF_KEY: &str = "cartCheckoutData";

/// String-keyed blob storage, the shape of the browser-local persistence
/// surface this core runs against.
///
/// Implementations must be cheap to clone; clones observe the same
/// underlying storage.
pub trait KeyValueStore: Clone + Send + Sync {
    /// Read the blob under `key`, if present.
    fn get(&self, key: &str) -> Option<String>;
    /// Write the blob under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);
    /// Delete the blob under `key`. Absent keys are a no-op.
    fn remove(&self, key: &str);
}

/// In-memory store, exclusively owned by one session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// Durable guest cart: the full line-item array under [`GUEST_CART_KEY`].
///
/// Scoped to guest sessions only; never consulted while authenticated.
#[derive(Debug, Clone)]
pub struct GuestCartStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> GuestCartStore<S> {
    /// Wrap a key-value store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Load the cached guest cart. Missing or corrupt data reads as an
    /// empty cart.
    #[must_use]
    pub fn load(&self) -> Vec<LineItem> {
        let Some(blob) = self.store.get(GUEST_CART_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&blob) {
            Ok(items) => items,
            Err(e) => {
                warn!("Discarding unparsable guest cart blob: {e}");
                Vec::new()
            }
        }
    }

    /// Persist the full guest cart array.
    pub fn save(&self, items: &[LineItem]) {
        match serde_json::to_string(items) {
            Ok(blob) => self.store.set(GUEST_CART_KEY, blob),
            Err(e) => warn!("Failed to serialize guest cart: {e}"),
        }
    }

    /// Erase the cached guest cart.
    pub fn erase(&self) {
        self.store.remove(GUEST_CART_KEY);
    }
}

/// The value handed from the cart page to the checkout page: the applied
/// coupon code and its computed discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutHandoff {
    /// Applied coupon code, empty if none was applied.
    pub coupon_code: String,
    /// Discount amount computed on the cart page.
    pub discount: Decimal,
}

/// Short-lived handoff store under [`CHECKOUT_HANDOFF_KEY`].
///
/// Read-once: [`CheckoutHandoffStore::take`] consumes the entry so a stale
/// coupon can't leak into a later checkout.
#[derive(Debug, Clone)]
pub struct CheckoutHandoffStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> CheckoutHandoffStore<S> {
    /// Wrap a key-value store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Stash the handoff for the upcoming checkout navigation.
    pub fn put(&self, handoff: &CheckoutHandoff) {
        match serde_json::to_string(handoff) {
            Ok(blob) => self.store.set(CHECKOUT_HANDOFF_KEY, blob),
            Err(e) => warn!("Failed to serialize checkout handoff: {e}"),
        }
    }

    /// Consume the handoff: read it and erase it in one step. Missing or
    /// corrupt data reads as `None`.
    pub fn take(&self) -> Option<CheckoutHandoff> {
        let blob = self.store.get(CHECKOUT_HANDOFF_KEY)?;
        self.store.remove(CHECKOUT_HANDOFF_KEY);
        match serde_json::from_str(&blob) {
            Ok(handoff) => Some(handoff),
            Err(e) => {
                warn!("Discarding unparsable checkout handoff blob: {e}");
                None
            }
        }
    }

    /// Erase without reading (cart cleared, checkout completed elsewhere).
    pub fn erase(&self) {
        self.store.remove(CHECKOUT_HANDOFF_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::{LineItemId, ProductId};

    fn line() -> LineItem {
        LineItem {
            local_id: LineItemId::generate(),
            product_id: ProductId::new("prod-1"),
            name: "Kurta".to_string(),
            unit_price: Decimal::new(1000, 0),
            quantity: 2,
            size: Some("M".to_string()),
            color: None,
            image: None,
        }
    }

    #[test]
    fn guest_cart_roundtrips() {
        let store = GuestCartStore::new(MemoryStore::new());
        let items = vec![line()];
        store.save(&items);
        assert_eq!(store.load(), items);

        store.erase();
        assert!(store.load().is_empty());
    }

    #[test]
    fn missing_and_corrupt_blobs_read_as_empty() {
        let backing = MemoryStore::new();
        let store = GuestCartStore::new(backing.clone());
        assert!(store.load().is_empty());

        backing.set(GUEST_CART_KEY, "{not json".to_string());
        assert!(store.load().is_empty());
    }

    #[test]
    fn handoff_is_read_once() {
        let store = CheckoutHandoffStore::new(MemoryStore::new());
        let handoff = CheckoutHandoff {
            coupon_code: "PAK10".to_string(),
            discount: Decimal::new(200, 0),
        };
        store.put(&handoff);

        assert_eq!(store.take(), Some(handoff));
        assert_eq!(store.take(), None, "second read must find nothing");
    }

    #[test]
    fn corrupt_handoff_reads_as_none_and_is_erased() {
        let backing = MemoryStore::new();
        let store = CheckoutHandoffStore::new(backing.clone());
        backing.set(CHECKOUT_HANDOFF_KEY, "???".to_string());

        assert_eq!(store.take(), None);
        assert_eq!(backing.get(CHECKOUT_HANDOFF_KEY), None);
    }
}
