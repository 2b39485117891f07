//! Cart reconciliation: the single owner of the cart the UI observes.
//!
//! The [`CartReconciler`] decides whether reads and writes go through the
//! guest cache or the remote API based on the session's [`AuthMode`], and
//! its derived totals are recomputed from the line items on every read so
//! they can never drift.
//!
//! Concurrency model: all mutating methods take `&mut self`, which
//! serializes mutations per cart instance (the UI is expected to disable
//! the triggering control while a round-trip is outstanding rather than
//! queue operations). Every adopted server response bumps a monotonic
//! [`CartReconciler::revision`], so a caller holding an older snapshot can
//! tell it has been superseded and must not treat it as authoritative.

pub mod cache;

use secrecy::SecretString;
use tracing::{instrument, warn};

use bazaar_core::{AuthMode, CartState, Coupon, LineItem, LineItemId, PricingBreakdown, UserProfile};

use crate::api::ApiClient;
use crate::api::types::{AddCartItemRequest, Product};
use crate::error::{CartOutcome, RecoveryAction, StoreError};
use crate::pricing::{CouponApplication, CouponBook};
use cache::{CheckoutHandoff, CheckoutHandoffStore, GuestCartStore, KeyValueStore};

/// Explicit session identity handed to the reconciler at construction.
///
/// Re-created per browser session; never ambient global state.
#[derive(Debug, Clone)]
pub struct Session {
    mode: AuthMode,
    user: Option<UserProfile>,
}

impl Session {
    /// A fresh unauthenticated session.
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            mode: AuthMode::Guest,
            user: None,
        }
    }

    /// A session restored for an already signed-in user.
    #[must_use]
    pub const fn authenticated(user: UserProfile) -> Self {
        Self {
            mode: AuthMode::Authenticated,
            user: Some(user),
        }
    }

    /// Current authentication mode.
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Profile of the signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    fn promote(&mut self, user: UserProfile) {
        self.mode = AuthMode::Authenticated;
        self.user = Some(user);
    }

    fn demote(&mut self) {
        self.mode = AuthMode::Guest;
        self.user = None;
    }
}

/// Result of merging a guest cart into the server cart at login.
///
/// A single bad item must not strand the rest of the guest cart, so the
/// merge continues past individual failures and reports how many lines
/// could not be replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// Guest lines the merge attempted to replay.
    pub attempted: usize,
    /// Lines the server accepted.
    pub merged: usize,
    /// Lines the server rejected or that failed in transit.
    pub failed: usize,
}

impl MergeReport {
    /// Whether every guest line made it into the server cart.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Single owner of the in-memory cart state exposed to the UI.
pub struct CartReconciler<S: KeyValueStore> {
    api: ApiClient,
    guest_cache: GuestCartStore<S>,
    handoff: CheckoutHandoffStore<S>,
    session: Session,
    cart: CartState,
    coupon: Option<Coupon>,
    revision: u64,
}

impl<S: KeyValueStore> CartReconciler<S> {
    /// Build a reconciler for a guest session, seeding the cart from the
    /// guest cache.
    pub fn new_guest(api: ApiClient, store: S) -> Self {
        let guest_cache = GuestCartStore::new(store.clone());
        let cart = CartState::from_items(guest_cache.load());
        Self {
            api,
            guest_cache,
            handoff: CheckoutHandoffStore::new(store),
            session: Session::guest(),
            cart,
            coupon: None,
            revision: 0,
        }
    }

    /// Build a reconciler for a restored authenticated session. The cart
    /// starts empty; call [`CartReconciler::refresh`] to pull the server
    /// cart.
    ///
    /// The `api` client must already carry the session's credentials
    /// (see [`ApiClient::with_session`]).
    pub fn new_authenticated(api: ApiClient, store: S, user: UserProfile) -> Self {
        Self {
            api,
            guest_cache: GuestCartStore::new(store.clone()),
            handoff: CheckoutHandoffStore::new(store),
            session: Session::authenticated(user),
            cart: CartState::new(),
            coupon: None,
            revision: 0,
        }
    }

    // =========================================================================
    // Read surface
    // =========================================================================

    /// The cart as the UI should render it.
    #[must_use]
    pub const fn cart(&self) -> &CartState {
        &self.cart
    }

    /// Derived: total quantity across lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.cart.item_count()
    }

    /// Derived: sum of unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> rust_decimal::Decimal {
        self.cart.subtotal()
    }

    /// Current session identity.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The coupon held for this session, if one was applied.
    #[must_use]
    pub const fn coupon(&self) -> Option<&Coupon> {
        self.coupon.as_ref()
    }

    /// Monotonic counter bumped each time a server cart is adopted.
    /// Snapshots taken at an older revision are stale and must not be
    /// treated as authoritative.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// API client bound to this session's credentials.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    fn adopt_remote(&mut self, cart: CartState) {
        self.revision += 1;
        self.cart = cart;
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Re-read cart truth: the server cart when authenticated, the guest
    /// cache otherwise.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> CartOutcome {
        if self.session.mode().is_authenticated() {
            match self.api.get_cart().await {
                Ok(cart) => {
                    self.adopt_remote(cart);
                    CartOutcome::ok("Cart refreshed")
                }
                Err(e) => {
                    warn!("Failed to fetch cart: {e}");
                    CartOutcome::from_api_error(&e, "Failed to fetch cart")
                }
            }
        } else {
            self.cart = CartState::from_items(self.guest_cache.load());
            CartOutcome::ok("Cart refreshed")
        }
    }

    /// Add a product to the cart.
    ///
    /// Quantity must be at least 1. When a line with the same
    /// (product, size, color) already exists, its quantity is incremented
    /// instead of appending a duplicate row. Authenticated sessions
    /// delegate to the server and adopt its returned cart verbatim; guest
    /// sessions mutate the local array and persist it to the guest cache.
    #[instrument(skip(self, product), fields(product_id = %product.id, quantity))]
    pub async fn add_item(
        &mut self,
        product: &Product,
        quantity: u32,
        size: Option<String>,
        color: Option<String>,
    ) -> CartOutcome {
        if quantity < 1 {
            return CartOutcome::failed("Quantity must be at least 1", RecoveryAction::Retry);
        }

        if self.session.mode().is_authenticated() {
            let request = AddCartItemRequest {
                product_id: product.id.clone(),
                quantity,
                size: size.unwrap_or_default(),
                color: color.unwrap_or_default(),
            };
            match self.api.add_cart_item(&request).await {
                Ok(cart) => {
                    self.adopt_remote(cart);
                    CartOutcome::ok("Added to cart")
                }
                Err(e) => {
                    warn!("Failed to add to cart: {e}");
                    CartOutcome::from_api_error(&e, "Failed to add to cart")
                }
            }
        } else {
            let candidate = LineItem {
                local_id: LineItemId::generate(),
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price: product.effective_price(),
                quantity,
                size: size.filter(|v| !v.is_empty()),
                color: color.filter(|v| !v.is_empty()),
                image: product.primary_image().map(String::from),
            };

            if let Some(existing) = self
                .cart
                .items
                .iter_mut()
                .find(|item| item.same_variant(&candidate))
            {
                existing.quantity = existing.quantity.saturating_add(quantity);
            } else {
                self.cart.items.push(candidate);
            }

            self.guest_cache.save(&self.cart.items);
            CartOutcome::ok("Added to cart")
        }
    }

    /// Remove a cart line. Idempotent: an absent id leaves the cart
    /// untouched and still succeeds.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_item(&mut self, line_id: &LineItemId) -> CartOutcome {
        if self.cart.find(line_id).is_none() {
            return CartOutcome::ok("Item removed from cart");
        }

        if self.session.mode().is_authenticated() {
            match self.api.remove_cart_item(line_id).await {
                Ok(cart) => {
                    self.adopt_remote(cart);
                    CartOutcome::ok("Item removed from cart")
                }
                Err(e) => {
                    warn!("Failed to remove from cart: {e}");
                    CartOutcome::from_api_error(&e, "Failed to remove item")
                }
            }
        } else {
            self.cart.items.retain(|item| &item.local_id != line_id);
            self.guest_cache.save(&self.cart.items);
            CartOutcome::ok("Item removed from cart")
        }
    }

    /// Replace a line's quantity. A quantity below 1 behaves as removal;
    /// the cart never stores a zero-quantity line.
    #[instrument(skip(self), fields(line_id = %line_id, quantity))]
    pub async fn update_quantity(&mut self, line_id: &LineItemId, quantity: u32) -> CartOutcome {
        if quantity < 1 {
            return self.remove_item(line_id).await;
        }

        if self.cart.find(line_id).is_none() {
            return CartOutcome::ok("Cart updated");
        }

        if self.session.mode().is_authenticated() {
            match self.api.update_cart_item(line_id, quantity).await {
                Ok(cart) => {
                    self.adopt_remote(cart);
                    CartOutcome::ok("Cart updated")
                }
                Err(e) => {
                    warn!("Failed to update cart: {e}");
                    CartOutcome::from_api_error(&e, "Failed to update cart")
                }
            }
        } else {
            for item in &mut self.cart.items {
                if &item.local_id == line_id {
                    item.quantity = quantity;
                }
            }
            self.guest_cache.save(&self.cart.items);
            CartOutcome::ok("Cart updated")
        }
    }

    /// Empty the cart. Authenticated sessions also clear the server cart;
    /// guest sessions erase the cached entry. Any held coupon and pending
    /// checkout handoff are dropped with it.
    ///
    /// On a remote failure nothing is emptied: the prior state is retained
    /// unchanged so the caller can retry.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) -> CartOutcome {
        if self.session.mode().is_authenticated() {
            if let Err(e) = self.api.clear_cart().await {
                warn!("Failed to clear cart: {e}");
                return CartOutcome::from_api_error(&e, "Failed to clear cart");
            }
        }

        self.adopt_remote(CartState::new());
        self.coupon = None;
        self.guest_cache.erase();
        self.handoff.erase();
        CartOutcome::ok("Cart cleared")
    }

    // =========================================================================
    // Coupons & checkout handoff
    // =========================================================================

    /// Try a coupon code against the store's coupon book. An applied
    /// coupon is held in session state until checkout or clear; re-applying
    /// the same code is idempotent. Unknown codes leave the held coupon
    /// untouched and report [`CouponApplication::NotApplied`].
    pub fn apply_coupon(&mut self, code: &str, book: &CouponBook) -> CouponApplication {
        let application = book.apply(code);
        if let CouponApplication::Applied(coupon) = &application {
            self.coupon = Some(coupon.clone());
        }
        application
    }

    /// Stash the applied coupon and its priced discount for the checkout
    /// page to consume (read-once).
    pub fn handoff_to_checkout(&self, breakdown: &PricingBreakdown) {
        self.handoff.put(&CheckoutHandoff {
            coupon_code: self
                .coupon
                .as_ref()
                .map(|coupon| coupon.code.clone())
                .unwrap_or_default(),
            discount: breakdown.discount_amount,
        });
    }

    /// Consume the checkout handoff written by the cart page, if any.
    pub fn take_checkout_handoff(&self) -> Option<CheckoutHandoff> {
        self.handoff.take()
    }

    /// Drop the held coupon (consumed by a successful checkout).
    pub(crate) fn invalidate_coupon(&mut self) {
        self.coupon = None;
        self.handoff.erase();
    }

    /// Empty the in-memory mirror after a successful order.
    pub(crate) fn adopt_cleared(&mut self) {
        self.adopt_remote(CartState::new());
        self.guest_cache.erase();
    }

    // =========================================================================
    // Authentication transitions
    // =========================================================================

    /// One-time Guest to Authenticated merge.
    ///
    /// Replays each guest line against the server cart (preserving
    /// size/color/quantity), continuing past individual failures, then
    /// discards the guest cache and adopts the server cart as truth.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidState`] if the session is already
    /// authenticated; the merge runs exactly once per transition.
    #[instrument(skip(self, user, token), fields(user_id = %user.id))]
    pub async fn reconcile_on_auth(
        &mut self,
        user: UserProfile,
        token: SecretString,
    ) -> Result<MergeReport, StoreError> {
        if self.session.mode().is_authenticated() {
            return Err(StoreError::InvalidState(
                "session is already authenticated; guest merge already ran".to_string(),
            ));
        }

        self.api = self.api.with_session(token);
        self.session.promote(user);

        let guest_items = std::mem::take(&mut self.cart.items);
        let attempted = guest_items.len();
        let mut failed = 0usize;
        let mut latest: Option<CartState> = None;

        for item in guest_items {
            let request = AddCartItemRequest {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                size: item.size.clone().unwrap_or_default(),
                color: item.color.clone().unwrap_or_default(),
            };
            match self.api.add_cart_item(&request).await {
                Ok(cart) => latest = Some(cart),
                Err(e) => {
                    failed += 1;
                    warn!(
                        product_id = %item.product_id,
                        "Failed to merge guest cart line: {e}"
                    );
                }
            }
        }

        // The guest cache is spent either way; failed lines are reported,
        // not retried from stale local state.
        self.guest_cache.erase();

        // Prefer a full re-fetch so the mirror reflects the server's final
        // reconciled view; fall back to the last accepted response.
        match self.api.get_cart().await {
            Ok(cart) => self.adopt_remote(cart),
            Err(e) => {
                warn!("Failed to fetch cart after merge: {e}");
                if let Some(cart) = latest {
                    self.adopt_remote(cart);
                }
            }
        }

        Ok(MergeReport {
            attempted,
            merged: attempted - failed,
            failed,
        })
    }

    /// Authenticated to Guest transition. Drops credentials and the
    /// in-memory remote mirror; the guest cache is *not* repopulated from
    /// server data (guest and authenticated carts are not symmetric).
    #[instrument(skip(self))]
    pub async fn logout(&mut self) -> CartOutcome {
        if !self.session.mode().is_authenticated() {
            return CartOutcome::ok("Logged out");
        }

        if let Err(e) = self.api.logout().await {
            // The local session ends regardless; the server session will
            // expire on its own.
            warn!("Logout request failed: {e}");
        }

        self.api = self.api.without_session();
        self.session.demote();
        self.adopt_remote(CartState::from_items(self.guest_cache.load()));
        self.coupon = None;
        CartOutcome::ok("Logged out")
    }
}
