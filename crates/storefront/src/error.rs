//! Unified error handling for the storefront core.
//!
//! Lower layers carry their own error types ([`crate::api::ApiError`] at
//! the HTTP boundary); this module unifies them for callers that want a
//! single error channel, and defines the outcome types the UI consumes.
//! Cart mutations never surface raw errors: they return a [`CartOutcome`]
//! with a human-readable message and, on failure, a recovery action.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;

/// Application-level error type for the storefront core.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration loading failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Client-side validation rejected the input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation attempted in a state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// What the UI should offer the user after a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Transient failure; the same action can simply be retried.
    Retry,
    /// The session is stale or missing; prompt for login before retrying.
    Reauthenticate,
}

/// Success/failure result of a cart mutation.
///
/// Mutations never leave the cart in a partially-applied state: on failure
/// the prior in-memory cart is retained unchanged and the outcome carries
/// a message plus a recovery action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartOutcome {
    /// Whether the mutation was applied.
    pub success: bool,
    /// Human-readable message for display.
    pub message: String,
    /// Suggested recovery on failure; `None` on success.
    pub recovery: Option<RecoveryAction>,
}

impl CartOutcome {
    /// Successful outcome with a display message.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            recovery: None,
        }
    }

    /// Failed outcome with a display message and recovery action.
    #[must_use]
    pub fn failed(message: impl Into<String>, recovery: RecoveryAction) -> Self {
        Self {
            success: false,
            message: message.into(),
            recovery: Some(recovery),
        }
    }

    /// Map an API failure to an outcome, preserving the auth/transient
    /// distinction the UI's recovery prompt depends on.
    #[must_use]
    pub fn from_api_error(error: &ApiError, context: &str) -> Self {
        let recovery = if error.is_auth() {
            RecoveryAction::Reauthenticate
        } else {
            RecoveryAction::Retry
        };
        Self::failed(format!("{context}: {error}"), recovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_reauthenticate() {
        let err = ApiError::Unauthorized("session expired".to_string());
        let outcome = CartOutcome::from_api_error(&err, "Failed to add to cart");
        assert!(!outcome.success);
        assert_eq!(outcome.recovery, Some(RecoveryAction::Reauthenticate));
        assert!(outcome.message.contains("Failed to add to cart"));
    }

    #[test]
    fn rejections_map_to_retry() {
        let err = ApiError::Rejected {
            status: 422,
            message: "out of stock".to_string(),
        };
        let outcome = CartOutcome::from_api_error(&err, "Failed to add to cart");
        assert_eq!(outcome.recovery, Some(RecoveryAction::Retry));
    }
}
