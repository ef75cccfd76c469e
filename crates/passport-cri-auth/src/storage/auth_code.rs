//! Authorization code persistence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;

/// A persisted authorization code.
///
/// Only the SHA-256 hash of the code is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeItem {
    /// Lowercase hex SHA-256 of the code.
    pub auth_code_hash: String,

    /// Identity check resource the code grants access to.
    pub resource_id: String,

    /// Redirect URI the code was delivered to.
    pub redirect_url: String,

    /// When the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Storage operations for authorization codes, keyed by code hash.
#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    /// Store a new code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, item: &AuthorizationCodeItem) -> AuthResult<()>;

    /// Find a code by its hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, auth_code_hash: &str) -> AuthResult<Option<AuthorizationCodeItem>>;

    /// Delete a code by its hash. Deleting an unknown code is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, auth_code_hash: &str) -> AuthResult<()>;
}
