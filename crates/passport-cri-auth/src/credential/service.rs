//! Credential issuance pipeline.
//!
//! Request JWT subject, then bearer token, then identity check record, then
//! assembly and signing. Each step short-circuits on failure.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;

use crate::audit::{self, AuditEventType, AuditSink};
use crate::logging;
use crate::storage::{AccessTokenStore, IdentityCheckStore};
use crate::token::{AccessTokenResolver, CredentialSigner};
use crate::{AuthError, AuthResult};

use super::assembler::CredentialAssembler;
use super::model::CredentialClaims;

/// Description returned when the request JWT carries no subject.
pub const MISSING_SUBJECT_DESCRIPTION: &str =
    "Invalid request Subject is missing from Request JWT";

/// Reads `sub` from a compact JWT without verifying it.
///
/// The request JWT only names the subject the credential is issued for; the
/// bearer token is what authorizes the call.
///
/// # Errors
///
/// Returns `InvalidRequest` if the body is not a JWT or has no string `sub`.
pub fn subject_from_request_jwt(request_jwt: &str) -> AuthResult<String> {
    let missing = || AuthError::invalid_request(MISSING_SUBJECT_DESCRIPTION);

    let payload = request_jwt
        .trim()
        .split('.')
        .nth(1)
        .filter(|part| !part.is_empty())
        .ok_or_else(missing)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|_| missing())?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| missing())?;

    claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|sub| !sub.is_empty())
        .map(ToString::to_string)
        .ok_or_else(missing)
}

/// A signed credential ready to return.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// Resource id the credential was built from.
    pub resource_id: String,

    /// Compact RS256 JWT with claims `sub` and `vc`.
    pub jwt: String,
}

/// Issues passport verifiable credentials.
pub struct CredentialIssuer {
    resolver: AccessTokenResolver,
    records: Arc<dyn IdentityCheckStore>,
    signer: Arc<CredentialSigner>,
    audit: Arc<dyn AuditSink>,
}

impl CredentialIssuer {
    /// Creates an issuer.
    #[must_use]
    pub fn new(
        access_tokens: Arc<dyn AccessTokenStore>,
        records: Arc<dyn IdentityCheckStore>,
        signer: Arc<CredentialSigner>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            resolver: AccessTokenResolver::new(access_tokens),
            records,
            signer,
            audit,
        }
    }

    /// Issues the credential for the record the bearer token points at.
    ///
    /// # Arguments
    /// * `request_jwt` - Request body; only its `sub` claim is read
    /// * `authorization` - Raw `Authorization` header value, if any
    ///
    /// # Errors
    ///
    /// * `InvalidRequest` if the request JWT has no subject
    /// * token resolution errors, see [`AccessTokenResolver::resolve`]
    /// * `Storage` if the record is absent or cannot be read
    /// * `CredentialAssembly` if the record lacks a required field
    /// * `Signing` if signing fails
    pub async fn issue(
        &self,
        request_jwt: &str,
        authorization: Option<&str>,
    ) -> AuthResult<IssuedCredential> {
        let subject = subject_from_request_jwt(request_jwt)?;
        let resource_id = self.resolver.resolve(authorization).await?;
        logging::attach_session_id(&resource_id);

        let record = self.records.load(&resource_id).await?.ok_or_else(|| {
            tracing::error!(resource_id = %resource_id, "Identity check record not found");
            AuthError::storage(format!(
                "No identity check record for resource {resource_id}"
            ))
        })?;

        let vc = CredentialAssembler::assemble(&record)?;
        let jwt = self.signer.sign(&CredentialClaims { sub: subject, vc })?;

        tracing::info!(resource_id = %resource_id, "Credential issued");
        audit::emit(self.audit.as_ref(), AuditEventType::IpvPassportCriVcIssued).await;

        Ok(IssuedCredential { resource_id, jwt })
    }
}
