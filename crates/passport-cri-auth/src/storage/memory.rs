//! In-memory storage implementations.
//!
//! Used by the development server and by tests. Nothing here survives a
//! restart.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::AuthResult;
use crate::config::IssuerConfig;
use crate::credential::IdentityCheckRecord;

use super::{
    AccessTokenStore, AuthorizationCodeItem, AuthorizationCodeStore, ClientConfigStore,
    ClientTrustConfig, IdentityCheckStore,
};

// =============================================================================
// Clients
// =============================================================================

/// Client trust configuration taken from the issuer configuration file.
#[derive(Debug, Clone)]
pub struct StaticClientConfig {
    config: IssuerConfig,
}

impl StaticClientConfig {
    /// Creates a store over the clients registered in `config`.
    #[must_use]
    pub fn new(config: IssuerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClientConfigStore for StaticClientConfig {
    async fn find_client(&self, client_id: &str) -> AuthResult<Option<ClientTrustConfig>> {
        Ok(self
            .config
            .clients
            .get(client_id)
            .map(|client| ClientTrustConfig {
                client_id: client_id.to_string(),
                issuer: client.issuer.clone(),
                audience: self.config.audience.clone(),
                signing_key: client.signing_key.clone(),
                redirect_uris: client.redirect_uris.clone(),
                max_token_ttl: self.config.jar.max_token_ttl,
            }))
    }
}

// =============================================================================
// Access tokens
// =============================================================================

/// Access token to resource id mapping.
#[derive(Debug, Default)]
pub struct InMemoryAccessTokenStore {
    tokens: DashMap<String, String>,
}

impl InMemoryAccessTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `access_token` grants access to `resource_id`.
    pub fn insert(&self, access_token: impl Into<String>, resource_id: impl Into<String>) {
        self.tokens.insert(access_token.into(), resource_id.into());
    }
}

#[async_trait]
impl AccessTokenStore for InMemoryAccessTokenStore {
    async fn resource_id(&self, access_token: &str) -> AuthResult<Option<String>> {
        Ok(self.tokens.get(access_token).map(|entry| entry.clone()))
    }
}

// =============================================================================
// Identity checks
// =============================================================================

/// Identity check records keyed by resource id.
#[derive(Debug, Default)]
pub struct InMemoryIdentityCheckStore {
    records: DashMap<String, IdentityCheckRecord>,
}

impl InMemoryIdentityCheckStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` under its resource id, replacing any previous one.
    pub fn insert(&self, record: IdentityCheckRecord) {
        self.records.insert(record.resource_id.clone(), record);
    }
}

#[async_trait]
impl IdentityCheckStore for InMemoryIdentityCheckStore {
    async fn load(&self, resource_id: &str) -> AuthResult<Option<IdentityCheckRecord>> {
        Ok(self.records.get(resource_id).map(|entry| entry.clone()))
    }
}

// =============================================================================
// Authorization codes
// =============================================================================

/// Authorization codes keyed by code hash.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationCodeStore {
    codes: DashMap<String, AuthorizationCodeItem>,
}

impl InMemoryAuthorizationCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns `true` if no codes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl AuthorizationCodeStore for InMemoryAuthorizationCodeStore {
    async fn create(&self, item: &AuthorizationCodeItem) -> AuthResult<()> {
        self.codes
            .insert(item.auth_code_hash.clone(), item.clone());
        Ok(())
    }

    async fn find_by_hash(
        &self,
        auth_code_hash: &str,
    ) -> AuthResult<Option<AuthorizationCodeItem>> {
        Ok(self.codes.get(auth_code_hash).map(|entry| entry.clone()))
    }

    async fn delete(&self, auth_code_hash: &str) -> AuthResult<()> {
        self.codes.remove(auth_code_hash);
        Ok(())
    }
}
