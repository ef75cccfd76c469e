//! Client trust configuration lookup.

use std::time::Duration;

use async_trait::async_trait;

use crate::AuthResult;

/// Everything the issuer trusts about a registered client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientTrustConfig {
    /// OAuth client id.
    pub client_id: String,

    /// Expected `iss` claim of the client's request objects.
    pub issuer: String,

    /// Audience shared by all clients of this issuer.
    pub audience: String,

    /// Current request signing key, as stored (JWK JSON).
    ///
    /// Kept unparsed so that malformed key material surfaces as a signature
    /// validation failure rather than a lookup failure.
    pub signing_key: String,

    /// Registered redirect URIs, compared by exact string match.
    pub redirect_uris: Vec<String>,

    /// Longest accepted request object lifetime.
    pub max_token_ttl: Duration,
}

impl ClientTrustConfig {
    /// Returns `true` if `redirect_uri` is one of the registered URIs.
    #[must_use]
    pub fn is_registered_redirect(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|uri| uri == redirect_uri)
    }
}

/// Lookup of client trust configuration.
///
/// # Example
///
/// ```ignore
/// use passport_cri_auth::storage::ClientConfigStore;
///
/// async fn example(store: &impl ClientConfigStore) {
///     if let Some(client) = store.find_client("ipv-core").await? {
///         println!("issuer: {}", client.issuer);
///     }
/// }
/// ```
#[async_trait]
pub trait ClientConfigStore: Send + Sync {
    /// Find the trust configuration of a client.
    ///
    /// Returns `None` if the client id is not registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration source cannot be read.
    async fn find_client(&self, client_id: &str) -> AuthResult<Option<ClientTrustConfig>>;
}
