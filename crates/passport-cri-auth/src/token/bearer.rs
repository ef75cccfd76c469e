//! Bearer access token resolution.
//!
//! The credential endpoint is authorized with an opaque access token issued by
//! the token endpoint. Resolving it yields the resource id the identity check
//! record is stored under.

use std::sync::Arc;

use crate::storage::AccessTokenStore;
use crate::{AuthError, AuthResult};

/// Description returned when the `Authorization` header is not a bearer token.
pub const INVALID_REQUEST_DESCRIPTION: &str = "Invalid request";

/// Description returned when the access token is unknown.
pub const ACCESS_DENIED_DESCRIPTION: &str = "Access denied by resource owner or authorization server - The supplied access token was not found in the database";

/// Extracts the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively.
///
/// # Errors
///
/// Returns `InvalidRequest` if the value is not `Bearer <token>` or the token
/// is empty.
pub fn parse_bearer(header_value: &str) -> AuthResult<&str> {
    let (scheme, token) = header_value
        .split_once(' ')
        .ok_or_else(|| AuthError::invalid_request(INVALID_REQUEST_DESCRIPTION))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::invalid_request(INVALID_REQUEST_DESCRIPTION));
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::invalid_request(INVALID_REQUEST_DESCRIPTION));
    }

    Ok(token)
}

/// Resolves bearer access tokens to resource ids.
pub struct AccessTokenResolver {
    store: Arc<dyn AccessTokenStore>,
}

impl AccessTokenResolver {
    /// Creates a resolver backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn AccessTokenStore>) -> Self {
        Self { store }
    }

    /// Resolves the raw `Authorization` header value to a resource id.
    ///
    /// # Errors
    ///
    /// * `MissingToken` if no header was sent
    /// * `InvalidRequest` if the header is not a bearer token; the store is
    ///   not consulted
    /// * `AccessDenied` if the token is unknown
    /// * the store's own error if the lookup fails
    pub async fn resolve(&self, authorization: Option<&str>) -> AuthResult<String> {
        let header_value = authorization.ok_or(AuthError::MissingToken)?;
        let token = parse_bearer(header_value)?;

        match self.store.resource_id(token).await? {
            Some(resource_id) => {
                tracing::debug!(resource_id = %resource_id, "Access token resolved");
                Ok(resource_id)
            }
            None => {
                tracing::debug!("Access token not found");
                Err(AuthError::access_denied(ACCESS_DENIED_DESCRIPTION))
            }
        }
    }
}
