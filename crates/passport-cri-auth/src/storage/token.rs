//! Access token lookup.

use async_trait::async_trait;

use crate::AuthResult;

/// Read-only mapping from issued access tokens to identity check resources.
///
/// Tokens are issued elsewhere; this crate only resolves them.
#[async_trait]
pub trait AccessTokenStore: Send + Sync {
    /// Resolve the resource id an access token was issued for.
    ///
    /// Returns `None` if the token is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn resource_id(&self, access_token: &str) -> AuthResult<Option<String>>;
}
