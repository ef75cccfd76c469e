//! # passport-cri-auth
//!
//! Core of the passport credential issuer.
//!
//! This crate provides:
//! - Validation of JWT-secured authorization requests (encrypted, ES256 signed)
//! - Authorization code issuance
//! - Bearer access token resolution
//! - Assembly and RS256 signing of passport verifiable credentials
//! - Axum handlers for the authorization and credential endpoints
//!
//! ## Overview
//!
//! Two request paths share this crate. The authorization path decrypts the
//! request object, verifies it against the client's registered key and checks
//! its claims, ending in a [`jar::ValidationOutcome`]. The issuance path
//! resolves a bearer token to the stored identity check and returns it as a
//! signed credential. Both are stateless per request; collaborators are
//! reached through the traits in [`storage`] and [`jar::KeyManagementService`].
//!
//! ## Modules
//!
//! - [`config`] - Issuer configuration
//! - [`jar`] - Authorization request object validation
//! - [`oauth`] - Authorization responses and codes
//! - [`token`] - Bearer token resolution and credential signing
//! - [`credential`] - Verifiable credential model, assembly and issuance
//! - [`storage`] - Storage traits and in-memory implementations
//! - [`audit`] - Audit events
//! - [`logging`] - Request-scoped log fields
//! - [`http`] - Axum HTTP handlers

pub mod audit;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod jar;
pub mod logging;
pub mod oauth;
pub mod storage;
pub mod token;

pub use audit::{AuditEvent, AuditEventType, AuditSink, TracingAuditSink};
pub use config::{ConfigError, IssuerConfig};
pub use credential::{CredentialIssuer, IdentityCheckRecord, VerifiableCredential};
pub use error::{AuthError, ErrorCategory};
pub use http::{AuthorizeState, CredentialState, router};
pub use jar::{JarValidator, TtlPolicy, ValidationOutcome};
pub use logging::LogContext;
pub use oauth::AuthorizationCodeService;
pub use storage::{
    AccessTokenStore, AuthorizationCodeStore, ClientConfigStore, ClientTrustConfig,
    IdentityCheckStore,
};
pub use token::{AccessTokenResolver, CredentialSigner};

/// Type alias for issuer results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use passport_cri_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::audit::{AuditEvent, AuditEventType, AuditSink, TracingAuditSink};
    pub use crate::config::{ConfigError, IssuerConfig};
    pub use crate::credential::{CredentialIssuer, IdentityCheckRecord, VerifiableCredential};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{AuthorizeState, CredentialState, router};
    pub use crate::jar::{
        FatalFailure, JarValidator, KeyManagementService, RecoverableFailure, RsaOaepDecrypter,
        TtlPolicy, ValidatedRequest, ValidationOutcome,
    };
    pub use crate::logging::LogContext;
    pub use crate::oauth::AuthorizationCodeService;
    pub use crate::storage::{
        AccessTokenStore, AuthorizationCodeStore, ClientConfigStore, ClientTrustConfig,
        IdentityCheckStore,
    };
    pub use crate::token::{AccessTokenResolver, CredentialSigner};
}
