//! Session identity: who (if anyone) the cart belongs to.
//!
//! The session is an explicit value handed to the reconciler at
//! construction, re-created per browser session. There is no ambient
//! "current user" global anywhere in the workspace.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Whether the session is backed by a server account.
///
/// Guest carts live only in the local cache; authenticated carts mirror
/// the server. The two are not symmetric: logging out discards the remote
/// mirror without repopulating the guest cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthMode {
    /// Unauthenticated session; cart lives in the local cache.
    #[default]
    Guest,
    /// Logged-in session; the server cart is the source of truth.
    Authenticated,
}

impl AuthMode {
    /// Convenience predicate.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// Minimal profile of the signed-in user, as returned by the identity
/// endpoints. Only what checkout prefills need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-assigned user id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
}
