//! Authorization code issuance.
//!
//! Codes are 32 random bytes, base64url encoded. Only their SHA-256 hash is
//! persisted.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::storage::{AuthorizationCodeItem, AuthorizationCodeStore};

const CODE_BYTES: usize = 32;

/// Returns the lowercase hex SHA-256 of a code.
#[must_use]
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Generates, persists and revokes authorization codes.
pub struct AuthorizationCodeService {
    store: Arc<dyn AuthorizationCodeStore>,
    expiry: Duration,
}

impl AuthorizationCodeService {
    /// Creates a new service.
    ///
    /// # Arguments
    /// * `store` - Where code hashes are kept
    /// * `expiry` - How long a code stays redeemable
    #[must_use]
    pub fn new(store: Arc<dyn AuthorizationCodeStore>, expiry: Duration) -> Self {
        Self { store, expiry }
    }

    /// Generates a fresh code. The code is not persisted.
    #[must_use]
    pub fn generate_code(&self) -> String {
        let mut bytes = [0u8; CODE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Persists `code` as granting access to `resource_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn persist(&self, code: &str, resource_id: &str, redirect_url: &str) -> AuthResult<()> {
        let item = AuthorizationCodeItem {
            auth_code_hash: hash_code(code),
            resource_id: resource_id.to_string(),
            redirect_url: redirect_url.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.store.create(&item).await?;
        tracing::debug!(resource_id = %resource_id, "Authorization code persisted");
        Ok(())
    }

    /// Looks up a previously persisted code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn find(&self, code: &str) -> AuthResult<Option<AuthorizationCodeItem>> {
        self.store.find_by_hash(&hash_code(code)).await
    }

    /// Revokes a code so it can no longer be looked up.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke(&self, code: &str) -> AuthResult<()> {
        self.store.delete(&hash_code(code)).await
    }

    /// Returns `true` if the code was issued before the expiry window.
    ///
    /// A window reaching past the earliest representable time never expires.
    #[must_use]
    pub fn is_expired(&self, item: &AuthorizationCodeItem) -> bool {
        time::Duration::try_from(self.expiry)
            .ok()
            .and_then(|expiry| OffsetDateTime::now_utc().checked_sub(expiry))
            .is_some_and(|cutoff| item.created_at < cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryAuthorizationCodeStore;

    fn service(expiry: Duration) -> (Arc<InMemoryAuthorizationCodeStore>, AuthorizationCodeService) {
        let store = Arc::new(InMemoryAuthorizationCodeStore::new());
        let service = AuthorizationCodeService::new(store.clone(), expiry);
        (store, service)
    }

    #[test]
    fn test_hash_code_is_sha256_hex() {
        assert_eq!(
            hash_code("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_generated_codes_are_unique_and_url_safe() {
        let (_, service) = service(Duration::from_secs(600));
        let a = service.generate_code();
        let b = service.generate_code();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(!a.contains('+') && !a.contains('/') && !a.contains('='));
    }

    #[tokio::test]
    async fn test_persist_stores_hash_not_code() {
        let (store, service) = service(Duration::from_secs(600));
        service
            .persist("code-123", "resource-1", "https://example.com")
            .await
            .unwrap();

        assert!(store.find_by_hash("code-123").await.unwrap().is_none());
        let item = service.find("code-123").await.unwrap().unwrap();
        assert_eq!(item.auth_code_hash, hash_code("code-123"));
        assert_eq!(item.resource_id, "resource-1");
        assert_eq!(item.redirect_url, "https://example.com");
    }

    #[tokio::test]
    async fn test_revoke() {
        let (store, service) = service(Duration::from_secs(600));
        service
            .persist("code-123", "resource-1", "https://example.com")
            .await
            .unwrap();
        service.revoke("code-123").await.unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_is_expired() {
        let (_, service) = service(Duration::from_secs(600));
        let mut item = AuthorizationCodeItem {
            auth_code_hash: hash_code("c"),
            resource_id: "r".to_string(),
            redirect_url: "https://example.com".to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        assert!(!service.is_expired(&item));

        item.created_at = OffsetDateTime::now_utc() - Duration::from_secs(601);
        assert!(service.is_expired(&item));
    }

    #[test]
    fn test_unbounded_expiry_never_expires() {
        let item = AuthorizationCodeItem {
            auth_code_hash: hash_code("c"),
            resource_id: "r".to_string(),
            redirect_url: "https://example.com".to_string(),
            created_at: OffsetDateTime::now_utc() - Duration::from_secs(365 * 24 * 3600),
        };

        for expiry in [Duration::MAX, Duration::from_secs(u64::from(u32::MAX) * 1000)] {
            let (_, service) = service(expiry);
            assert!(!service.is_expired(&item));
        }
    }
}
