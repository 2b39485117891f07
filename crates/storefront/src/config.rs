//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_API_BASE_URL` - Base URL of the backend REST API
//!
//! ## Optional
//! - `BAZAAR_CURRENCY` - ISO 4217 currency code (default: PKR)
//! - `BAZAAR_TAX_RATE` - GST fraction applied at checkout (default: 0.15)
//! - `BAZAAR_FREE_SHIPPING_THRESHOLD` - Subtotal at which shipping is free
//!   (default: 5000)
//! - `BAZAAR_FLAT_SHIPPING_RATE` - Standard shipping cost below the
//!   threshold (default: 200)
//! - `BAZAAR_PHONE_PREFIX` - Required phone country prefix (default: +92)
//! - `BAZAAR_PHONE_DIGITS` - National digit count after the prefix
//!   (default: 10)

use rust_decimal::Decimal;
use thiserror::Error;

use bazaar_core::CurrencyCode;

use crate::pricing::ShippingPolicy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the backend REST API (e.g., `https://api.example.pk`)
    pub api_base_url: String,
    /// Store currency
    pub currency: CurrencyCode,
    /// Tax rate applied to subtotal + shipping (0.15 = 15% GST)
    pub tax_rate: Decimal,
    /// Free-shipping threshold and flat rate below it
    pub shipping: ShippingPolicy,
    /// Required phone country prefix for shipping addresses
    pub phone_prefix: String,
    /// National digit count expected after the prefix
    pub phone_digits: usize,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = require("BAZAAR_API_BASE_URL")?;

        let currency = match optional("BAZAAR_CURRENCY").as_deref() {
            None | Some("PKR") => CurrencyCode::PKR,
            Some("USD") => CurrencyCode::USD,
            Some("EUR") => CurrencyCode::EUR,
            Some("GBP") => CurrencyCode::GBP,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "BAZAAR_CURRENCY".to_string(),
                    format!("unsupported currency code: {other}"),
                ));
            }
        };

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            currency,
            tax_rate: optional_decimal("BAZAAR_TAX_RATE", Decimal::new(15, 2))?,
            shipping: ShippingPolicy {
                free_threshold: optional_decimal(
                    "BAZAAR_FREE_SHIPPING_THRESHOLD",
                    Decimal::new(5000, 0),
                )?,
                flat_rate: optional_decimal("BAZAAR_FLAT_SHIPPING_RATE", Decimal::new(200, 0))?,
            },
            phone_prefix: optional("BAZAAR_PHONE_PREFIX").unwrap_or_else(|| "+92".to_string()),
            phone_digits: optional_usize("BAZAAR_PHONE_DIGITS", 10)?,
        })
    }

    /// Configuration with the original store defaults, pointed at the given
    /// backend. Useful for tests and local development.
    #[must_use]
    pub fn for_base_url(api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into();
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            currency: CurrencyCode::PKR,
            tax_rate: Decimal::new(15, 2),
            shipping: ShippingPolicy {
                free_threshold: Decimal::new(5000, 0),
                flat_rate: Decimal::new(200, 0),
            },
            phone_prefix: "+92".to_string(),
            phone_digits: 10,
        }
    }
}

fn require(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn optional_decimal(name: &str, default: Decimal) -> Result<Decimal, ConfigError> {
    optional(name).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), format!("{e}")))
    })
}

fn optional_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    optional(name).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), format!("{e}")))
    })
}
