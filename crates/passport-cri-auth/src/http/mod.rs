//! HTTP handlers for the credential issuer endpoints.
//!
//! # Available Handlers
//!
//! - [`authorize`] - Authorization endpoint taking an encrypted request object
//! - [`credential`] - Credential endpoint returning the signed credential

pub mod authorize;
pub mod credential;
pub mod error;

use axum::Router;
use axum::routing::{get, post};

pub use authorize::{AuthorizeParams, AuthorizeState, authorize_handler};
pub use credential::{APPLICATION_JWT, CredentialState, issue_credential_handler};
pub use error::ErrorBody;

/// Path of the authorization endpoint.
pub const AUTHORIZATION_PATH: &str = "/authorization";

/// Path of the credential endpoint.
pub const CREDENTIAL_PATH: &str = "/credential/issue";

/// Builds the router serving both issuer endpoints.
pub fn router(authorize: AuthorizeState, credential: CredentialState) -> Router {
    Router::new()
        .route(AUTHORIZATION_PATH, get(authorize_handler))
        .with_state(authorize)
        .merge(
            Router::new()
                .route(CREDENTIAL_PATH, post(issue_credential_handler))
                .with_state(credential),
        )
}
