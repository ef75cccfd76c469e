//! JWT-secured authorization requests (JAR).
//!
//! An authorization request arrives as a JWE wrapping an ES256-signed JWT.
//! Validation runs in a fixed order and stops at the first failure:
//!
//! 1. [`decrypt`] unwraps the JWE into the signed request object
//! 2. [`signature`] verifies it against the client's registered key
//! 3. [`claims`] checks the claim set and establishes a trusted redirect URI
//!
//! Every run ends in exactly one [`ValidationOutcome`]. Failures found before
//! a redirect URI is trusted are [`FatalFailure`]s and are answered directly;
//! later failures are [`RecoverableFailure`]s and are reported to the client
//! through its redirect URI.

pub mod claims;
pub mod decrypt;
pub mod outcome;
pub mod signature;
pub mod validator;

pub use claims::{
    Audience, AuthorizationRequestClaims, CLAIM_CHECKS, ClaimRejection, ClaimsContext,
    ClaimsValidator, REQUIRED_CLAIMS, RESPONSE_TYPE_CODE, TtlPolicy,
};
pub use decrypt::{
    ContentEncryption, JweEnvelope, JweError, JweHeader, JwsHeader, KEY_MANAGEMENT_ALGORITHM,
    KeyManagementService, RequestDecryptor, RsaOaepDecrypter, RsaOaepEncrypter,
    SignedRequestObject,
};
pub use outcome::{
    FatalFailure, FatalReason, JarErrorCode, RecoverableFailure, RecoverableReason,
    TrustedRedirectUri, ValidatedRequest, ValidationOutcome,
};
pub use signature::{REQUIRED_ALGORITHM, SignatureVerifier, VerifiedRequestObject, parse_signing_key};
pub use validator::JarValidator;
