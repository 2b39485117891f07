//! Wire types for the backend REST API.
//!
//! The backend speaks loosely-shaped camelCase JSON. Everything here is
//! normalized into the canonical `bazaar-core` types before it leaves this
//! module, so no caller ever branches on whether a cart line came from the
//! server or the guest cache.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{CartState, LineItem, LineItemId, OrderId, ProductId, UserId, UserProfile};

// =============================================================================
// Cart
// =============================================================================

/// Full reconciled cart as returned by every cart endpoint.
///
/// `cart_count` and `cart_total` are the server's own derived numbers; they
/// are accepted for logging but the normalized [`CartState`] recomputes its
/// totals from the lines, which keeps the no-drift invariant even against a
/// buggy backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartEnvelope {
    #[serde(default)]
    pub cart: Vec<RemoteCartLine>,
    #[serde(default)]
    pub cart_count: u32,
    #[serde(default)]
    pub cart_total: Decimal,
}

impl RemoteCartEnvelope {
    /// Normalize into the canonical cart shape.
    ///
    /// Lines with a quantity below 1 are dropped here; the data model never
    /// stores them.
    #[must_use]
    pub fn into_cart_state(self) -> CartState {
        CartState::from_items(
            self.cart
                .into_iter()
                .filter(|line| line.quantity >= 1)
                .map(RemoteCartLine::normalize)
                .collect(),
        )
    }
}

/// One cart line in the server's shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartLine {
    #[serde(rename = "_id")]
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl RemoteCartLine {
    /// Convert to the canonical [`LineItem`], mapping the server's
    /// empty-string variant placeholders to `None`.
    #[must_use]
    pub fn normalize(self) -> LineItem {
        LineItem {
            local_id: LineItemId::new(self.id),
            product_id: ProductId::new(self.product_id),
            name: self.name,
            unit_price: self.price,
            quantity: self.quantity,
            size: none_if_empty(self.size),
            color: none_if_empty(self.color),
            image: none_if_empty(self.image),
        }
    }
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Body for `POST /api/cart/add`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// The backend expects empty strings, not nulls, for unset variants.
    pub size: String,
    pub color: String,
}

/// Body for `PUT /api/cart/:itemId`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

// =============================================================================
// Products
// =============================================================================

/// A product as served by the public product endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
}

impl Product {
    /// The price a new cart line is created at: sale price when present.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.price)
    }

    /// Primary display image, if the product has one.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Response of `POST /api/orders/place`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub order: Option<PlacedOrder>,
}

/// Server-assigned order identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: OrderId,
}

// =============================================================================
// Auth
// =============================================================================

/// Body for `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for `POST /api/auth/signup`.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Response of the login/signup endpoints: the profile plus the session
/// token subsequent credentialed calls must carry.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: RemoteUser,
    pub token: String,
}

/// A user as served by the identity endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl RemoteUser {
    /// Convert to the canonical profile type.
    #[must_use]
    pub fn normalize(self) -> UserProfile {
        UserProfile {
            id: UserId::new(self.id),
            name: self.name,
            email: self.email,
        }
    }
}

/// Generic `{ "message": ... }` error payload the backend attaches to
/// non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_normalizes_lines_and_drops_zero_quantities() {
        let json = serde_json::json!({
            "cart": [
                {
                    "_id": "line-1",
                    "productId": "prod-1",
                    "name": "Kurta",
                    "price": 1000,
                    "quantity": 2,
                    "size": "M",
                    "color": "",
                    "image": "kurta.jpg"
                },
                {
                    "_id": "line-2",
                    "productId": "prod-2",
                    "name": "Shawl",
                    "price": 500,
                    "quantity": 0
                }
            ],
            "cartCount": 2,
            "cartTotal": 2000
        });

        let envelope: RemoteCartEnvelope =
            serde_json::from_value(json).expect("envelope should parse");
        let cart = envelope.into_cart_state();

        assert_eq!(cart.items.len(), 1, "zero-quantity line must be dropped");
        let line = cart.items.first().expect("one line");
        assert_eq!(line.local_id.as_str(), "line-1");
        assert_eq!(line.size.as_deref(), Some("M"));
        assert_eq!(line.color, None, "empty string normalizes to None");
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.subtotal(), Decimal::new(2000, 0));
    }

    #[test]
    fn product_effective_price_prefers_sale_price() {
        let json = serde_json::json!({
            "_id": "prod-1",
            "name": "Kurta",
            "price": 1200,
            "salePrice": 999,
            "images": ["a.jpg", "b.jpg"]
        });
        let product: Product = serde_json::from_value(json).expect("product should parse");
        assert_eq!(product.effective_price(), Decimal::new(999, 0));
        assert_eq!(product.primary_image(), Some("a.jpg"));
    }
}
