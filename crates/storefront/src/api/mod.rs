//! Backend REST API client.
//!
//! Thin typed wrapper over the storefront backend: public product reads,
//! credentialed cart CRUD, order placement, and the identity endpoints.
//! Product reads are cached with `moka` (5-minute TTL); cart and order
//! calls are never cached (mutable state).
//!
//! Error classification matters here: the reconciler's merge and retry
//! policy depends on telling an authentication failure apart from a
//! validation rejection or a network fault, so each is its own
//! [`ApiError`] variant.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use bazaar_core::{CartState, LineItemId, ProductId, UserProfile};

use crate::config::StoreConfig;
use types::{
    AddCartItemRequest, ApiMessage, AuthResponse, LoginRequest, PlaceOrderResponse, PlacedOrder,
    Product, RemoteCartEnvelope, SignupRequest, UpdateQuantityRequest,
};

/// Product cache TTL.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Errors that can occur when talking to the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never completed (connect failure, timeout, broken body).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 401/403: missing, stale, or insufficient credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 404: the referenced product, cart line, or order does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-2xx with a server-supplied error payload.
    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// 2xx response whose body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether this failure means the session needs re-authentication.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Client for the backend REST API.
///
/// Cheap to clone. Session credentials are attached per-clone via
/// [`ApiClient::with_session`], so one session's token never leaks into
/// another session's client.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
    session_token: Option<SecretString>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    product_cache: Cache<String, CacheValue>,
}

#[derive(Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}

impl ApiClient {
    /// Create a new unauthenticated client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(config: &StoreConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let product_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_base_url.clone(),
                product_cache,
            }),
            session_token: None,
        })
    }

    /// A clone of this client carrying the given session token. All
    /// credentialed endpoints require it.
    #[must_use]
    pub fn with_session(&self, token: SecretString) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            session_token: Some(token),
        }
    }

    /// A clone of this client with credentials dropped (logout).
    #[must_use]
    pub fn without_session(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            session_token: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.inner.client.request(method, self.url(path));
        if let Some(token) = &self.session_token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder
    }

    /// Send a request and decode the JSON body, mapping status classes to
    /// the error taxonomy.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ApiError::Unauthorized(server_message(&body)));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(server_message(&body)));
        }
        if !status.is_success() {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: server_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            debug!(
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            ApiError::Parse(e.to_string())
        })
    }

    // =========================================================================
    // Product Methods (public, cached)
    // =========================================================================

    /// Get the product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        let cache_key = "products".to_string();

        if let Some(CacheValue::Products(products)) =
            self.inner.product_cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self
            .send(self.request(reqwest::Method::GET, "/api/products"))
            .await?;

        self.inner
            .product_cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a single product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) =
            self.inner.product_cache.get(&cache_key).await
        {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .send(self.request(
                reqwest::Method::GET,
                &format!("/api/products/{product_id}"),
            ))
            .await?;

        self.inner
            .product_cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Cart Methods (credentialed, not cached - mutable state)
    // =========================================================================

    /// Fetch the current server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is invalid or the request fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<CartState, ApiError> {
        let envelope: RemoteCartEnvelope = self
            .send(self.request(reqwest::Method::GET, "/api/cart"))
            .await?;
        Ok(envelope.into_cart_state())
    }

    /// Add a line to the server cart. The response is the full reconciled
    /// cart, which callers adopt verbatim as the new truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is invalid, the item is rejected,
    /// or the request fails.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn add_cart_item(
        &self,
        request: &AddCartItemRequest,
    ) -> Result<CartState, ApiError> {
        let envelope: RemoteCartEnvelope = self
            .send(
                self.request(reqwest::Method::POST, "/api/cart/add")
                    .json(request),
            )
            .await?;
        Ok(envelope.into_cart_state())
    }

    /// Replace the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist, the session is invalid,
    /// or the request fails.
    #[instrument(skip(self), fields(line_id = %line_id, quantity))]
    pub async fn update_cart_item(
        &self,
        line_id: &LineItemId,
        quantity: u32,
    ) -> Result<CartState, ApiError> {
        let envelope: RemoteCartEnvelope = self
            .send(
                self.request(reqwest::Method::PUT, &format!("/api/cart/{line_id}"))
                    .json(&UpdateQuantityRequest { quantity }),
            )
            .await?;
        Ok(envelope.into_cart_state())
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is invalid or the request fails.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_cart_item(&self, line_id: &LineItemId) -> Result<CartState, ApiError> {
        let envelope: RemoteCartEnvelope = self
            .send(self.request(reqwest::Method::DELETE, &format!("/api/cart/{line_id}")))
            .await?;
        Ok(envelope.into_cart_state())
    }

    /// Clear the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is invalid or the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<CartState, ApiError> {
        let envelope: RemoteCartEnvelope = self
            .send(self.request(reqwest::Method::DELETE, "/api/cart/clear"))
            .await?;
        Ok(envelope.into_cart_state())
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Submit an assembled order payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the order, the session is
    /// invalid, or the request fails. A 2xx response with `success: false`
    /// is mapped to [`ApiError::Rejected`].
    #[instrument(skip_all)]
    pub async fn place_order<T: Serialize + Sync>(
        &self,
        order: &T,
    ) -> Result<PlacedOrder, ApiError> {
        let response: PlaceOrderResponse = self
            .send(
                self.request(reqwest::Method::POST, "/api/orders/place")
                    .json(order),
            )
            .await?;

        if !response.success {
            return Err(ApiError::Rejected {
                status: 200,
                message: response
                    .message
                    .unwrap_or_else(|| "Failed to place order".to_string()),
            });
        }

        response.order.ok_or_else(|| {
            ApiError::Parse("order placement response carried no order".to_string())
        })
    }

    // =========================================================================
    // Identity Methods (lifecycle is external; we only consume the signal)
    // =========================================================================

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] on bad credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(UserProfile, SecretString), ApiError> {
        let response: AuthResponse = self
            .send(
                self.request(reqwest::Method::POST, "/api/auth/login")
                    .json(&LoginRequest {
                        email: email.to_string(),
                        password: password.to_string(),
                    }),
            )
            .await?;
        Ok((response.user.normalize(), SecretString::from(response.token)))
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the signup is rejected or the request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(UserProfile, SecretString), ApiError> {
        let response: AuthResponse = self
            .send(
                self.request(reqwest::Method::POST, "/api/auth/signup")
                    .json(&SignupRequest {
                        name: name.to_string(),
                        email: email.to_string(),
                        password: password.to_string(),
                    }),
            )
            .await?;
        Ok((response.user.normalize(), SecretString::from(response.token)))
    }

    /// End the server session. The local session is dropped regardless of
    /// the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let _: ApiMessage = self
            .send(self.request(reqwest::Method::POST, "/api/auth/logout"))
            .await?;
        Ok(())
    }

    /// Fetch the profile of the currently authenticated user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the session is missing or
    /// stale.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let user: types::RemoteUser = self
            .send(self.request(reqwest::Method::GET, "/api/user/getcurrentuser"))
            .await?;
        Ok(user.normalize())
    }
}

/// Pull a human-readable message out of a `{ "message": ... }` error body,
/// falling back to the raw (truncated) text.
fn server_message(body: &str) -> String {
    if let Ok(ApiMessage {
        message: Some(message),
    }) = serde_json::from_str::<ApiMessage>(body)
    {
        return message;
    }
    let trimmed: String = body.chars().take(200).collect();
    if trimmed.is_empty() {
        "no error details provided".to_string()
    } else {
        trimmed
    }
}
