//! Outcome of authorization request validation.
//!
//! A request either validates, fails before a redirect target has been
//! proven (fatal: reported directly to the caller), or fails after the
//! redirect URI matched a registered one (recoverable: reported to the client
//! by redirect). The recoverable variant can only be built from a
//! [`TrustedRedirectUri`], which only the claims validator can mint.

use std::fmt;

use crate::oauth::AuthorizationError;

use super::AuthorizationRequestClaims;

// =============================================================================
// Error codes
// =============================================================================

/// OAuth error codes reported by request object validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JarErrorCode {
    /// The request object is invalid.
    InvalidRequestObject,
    /// The client is unknown.
    InvalidClient,
    /// The request is not acceptable for the client.
    InvalidGrant,
    /// A collaborator failed.
    ServerError,
}

impl JarErrorCode {
    /// Returns the code as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequestObject => "invalid_request_object",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for JarErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Fatal failures
// =============================================================================

pub(crate) const DECRYPTION_FAILED: &str = "Failed to decrypt the request object";
pub(crate) const UNKNOWN_CLIENT: &str = "Unknown client id was provided";
pub(crate) const KEY_PARSE_FAILURE: &str =
    "Failed to parse JWT when attempting signature validation";
pub(crate) const ALGORITHM_MISMATCH: &str =
    "Signing algorithm used does not match required algorithm";
pub(crate) const SIGNATURE_INVALID: &str = "JWT signature validation failed";
pub(crate) const REDIRECT_URI_UNPARSEABLE: &str =
    "Failed to parse JWT claim set in order to access redirect_uri claim";
pub(crate) const REDIRECT_URI_UNREGISTERED: &str =
    "Invalid redirect_uri claim provided for configured client";

/// Why a request failed before a redirect target was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatalReason {
    /// The JWE could not be decrypted or its payload is not a signed JWT.
    DecryptionFailed,
    /// The client id is not registered.
    InvalidClient,
    /// The client's stored signing key could not be parsed.
    KeyParseFailure,
    /// The request was not signed with the required algorithm.
    AlgorithmMismatch,
    /// The signature did not verify.
    SignatureInvalid,
    /// The claim set or its `redirect_uri` claim could not be parsed.
    RequestObjectInvalid,
    /// The `redirect_uri` claim is not registered for the client.
    InvalidGrant,
    /// A collaborator failed while validating.
    ServerError,
}

impl FatalReason {
    /// Returns the OAuth error code reported for this reason.
    #[must_use]
    pub fn error_code(&self) -> JarErrorCode {
        match self {
            Self::DecryptionFailed
            | Self::KeyParseFailure
            | Self::AlgorithmMismatch
            | Self::SignatureInvalid
            | Self::RequestObjectInvalid => JarErrorCode::InvalidRequestObject,
            Self::InvalidClient => JarErrorCode::InvalidClient,
            Self::InvalidGrant => JarErrorCode::InvalidGrant,
            Self::ServerError => JarErrorCode::ServerError,
        }
    }
}

/// A failure that must be reported directly to the caller.
///
/// Carries no redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalFailure {
    /// Why validation failed.
    pub reason: FatalReason,
    /// Human readable description.
    pub description: String,
}

impl FatalFailure {
    /// Creates a failure with an explicit description.
    #[must_use]
    pub fn new(reason: FatalReason, description: impl Into<String>) -> Self {
        Self {
            reason,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn decryption_failed() -> Self {
        Self::new(FatalReason::DecryptionFailed, DECRYPTION_FAILED)
    }

    #[must_use]
    pub fn unknown_client() -> Self {
        Self::new(FatalReason::InvalidClient, UNKNOWN_CLIENT)
    }

    #[must_use]
    pub fn key_parse_failure() -> Self {
        Self::new(FatalReason::KeyParseFailure, KEY_PARSE_FAILURE)
    }

    #[must_use]
    pub fn algorithm_mismatch() -> Self {
        Self::new(FatalReason::AlgorithmMismatch, ALGORITHM_MISMATCH)
    }

    #[must_use]
    pub fn signature_invalid() -> Self {
        Self::new(FatalReason::SignatureInvalid, SIGNATURE_INVALID)
    }

    #[must_use]
    pub fn redirect_uri_unparseable() -> Self {
        Self::new(FatalReason::RequestObjectInvalid, REDIRECT_URI_UNPARSEABLE)
    }

    #[must_use]
    pub fn redirect_uri_unregistered() -> Self {
        Self::new(FatalReason::InvalidGrant, REDIRECT_URI_UNREGISTERED)
    }

    /// A collaborator failed; the detail is logged, not reported.
    #[must_use]
    pub fn server_error() -> Self {
        Self::new(
            FatalReason::ServerError,
            "The request object could not be validated",
        )
    }

    /// Returns the OAuth error code.
    #[must_use]
    pub fn error_code(&self) -> JarErrorCode {
        self.reason.error_code()
    }
}

impl fmt::Display for FatalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.description)
    }
}

// =============================================================================
// Recoverable failures
// =============================================================================

/// A redirect URI that matched one of the client's registered URIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedRedirectUri(String);

impl TrustedRedirectUri {
    /// Only the claims validator may vouch for a redirect URI.
    pub(in crate::jar) fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Returns the URI as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrustedRedirectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which post-trust check rejected the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoverableReason {
    /// One or more required claims are absent.
    MissingClaims,
    /// The `aud` claim does not name this issuer.
    AudienceRejected,
    /// The `iss` claim does not match the client's issuer.
    IssuerMismatch,
    /// The `response_type` claim is not `code`.
    ResponseTypeMismatch,
    /// The request object has expired.
    Expired,
    /// The request object is not valid yet.
    NotYetValid,
    /// The request object lives longer than allowed.
    TtlExceeded,
}

/// A failure reported to the client by redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverableFailure {
    /// Which check failed.
    pub reason: RecoverableReason,
    /// Human readable description.
    pub description: String,
    /// Where to send the error.
    pub redirect_uri: TrustedRedirectUri,
    /// The request's `state` claim, echoed back if present.
    pub state: Option<String>,
}

impl RecoverableFailure {
    /// Returns the OAuth error code, always `invalid_grant`.
    #[must_use]
    pub fn error_code(&self) -> JarErrorCode {
        JarErrorCode::InvalidGrant
    }

    /// Returns the error response to deliver by redirect.
    #[must_use]
    pub fn to_authorization_error(&self) -> AuthorizationError {
        AuthorizationError {
            error: self.error_code(),
            error_description: Some(self.description.clone()),
            state: self.state.clone(),
        }
    }

    /// Builds the redirect URL carrying this error.
    ///
    /// # Errors
    ///
    /// Returns an error if the registered redirect URI is not an absolute URL.
    pub fn to_redirect_url(&self) -> Result<String, url::ParseError> {
        self.to_authorization_error()
            .to_redirect_url(self.redirect_uri.as_str())
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// A request object that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    /// Client the request was validated for.
    pub client_id: String,
    /// Verified claim set.
    pub claims: AuthorizationRequestClaims,
    /// The request's registered redirect URI.
    pub redirect_uri: TrustedRedirectUri,
}

/// Result of validating an authorization request object.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Every check passed.
    Valid(ValidatedRequest),
    /// A check failed after the redirect URI was trusted.
    Recoverable(RecoverableFailure),
    /// A check failed before the redirect URI was trusted.
    Fatal(FatalFailure),
}

impl ValidationOutcome {
    /// Returns `true` if the request validated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Returns the OAuth error code of a failed outcome.
    #[must_use]
    pub fn error_code(&self) -> Option<JarErrorCode> {
        match self {
            Self::Valid(_) => None,
            Self::Recoverable(failure) => Some(failure.error_code()),
            Self::Fatal(failure) => Some(failure.error_code()),
        }
    }

    /// Returns the description of a failed outcome.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Valid(_) => None,
            Self::Recoverable(failure) => Some(&failure.description),
            Self::Fatal(failure) => Some(&failure.description),
        }
    }
}

impl From<Result<ValidatedRequest, FatalFailure>> for ValidationOutcome {
    fn from(result: Result<ValidatedRequest, FatalFailure>) -> Self {
        match result {
            Ok(request) => Self::Valid(request),
            Err(failure) => Self::Fatal(failure),
        }
    }
}
