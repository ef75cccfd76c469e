//! Identity check record lookup.

use async_trait::async_trait;

use crate::AuthResult;
use crate::credential::IdentityCheckRecord;

/// Storage of completed passport checks.
#[async_trait]
pub trait IdentityCheckStore: Send + Sync {
    /// Load the identity check stored under `resource_id`.
    ///
    /// Returns `None` if no check was stored for the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn load(&self, resource_id: &str) -> AuthResult<Option<IdentityCheckRecord>>;
}
