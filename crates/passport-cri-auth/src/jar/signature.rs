//! Request object signature verification.
//!
//! Request objects must be signed with ES256 (ECDSA on P-256 with SHA-256)
//! by the key currently registered for the client. The check runs in a fixed
//! order: client lookup, key parsing, algorithm, signature.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::storage::{ClientConfigStore, ClientTrustConfig};
use crate::token::jwt::JwtError;

use super::decrypt::SignedRequestObject;
use super::outcome::FatalFailure;

/// The only signing algorithm accepted for request objects.
pub const REQUIRED_ALGORITHM: Algorithm = Algorithm::ES256;

/// `alg` header value of [`REQUIRED_ALGORITHM`].
pub const REQUIRED_ALGORITHM_NAME: &str = "ES256";

/// A request object whose signature verified against the client's key.
#[derive(Debug, Clone)]
pub struct VerifiedRequestObject {
    /// Trust configuration of the client that signed it.
    pub client: ClientTrustConfig,

    /// The verified claim set, not yet interpreted.
    pub payload: Map<String, Value>,
}

/// Parses a stored JWK document into a verification key.
///
/// # Errors
///
/// Returns an error if the document is not a JWK or the key is unusable.
pub fn parse_signing_key(jwk_json: &str) -> Result<DecodingKey, JwtError> {
    let jwk: Jwk =
        serde_json::from_str(jwk_json).map_err(|e| JwtError::invalid_key(e.to_string()))?;
    DecodingKey::from_jwk(&jwk).map_err(JwtError::from)
}

/// Verifies request object signatures against registered client keys.
pub struct SignatureVerifier {
    clients: Arc<dyn ClientConfigStore>,
}

impl SignatureVerifier {
    /// Creates a verifier backed by `clients`.
    #[must_use]
    pub fn new(clients: Arc<dyn ClientConfigStore>) -> Self {
        Self { clients }
    }

    /// Verifies `request` as coming from `client_id`.
    ///
    /// # Errors
    ///
    /// Returns a fatal failure if the client is unknown, its key cannot be
    /// parsed, the algorithm is not ES256 or the signature does not verify.
    pub async fn verify(
        &self,
        request: &SignedRequestObject,
        client_id: &str,
    ) -> Result<VerifiedRequestObject, FatalFailure> {
        let client = match self.clients.find_client(client_id).await {
            Ok(Some(client)) => client,
            Ok(None) => {
                tracing::debug!(client_id = %client_id, "Unknown client");
                return Err(FatalFailure::unknown_client());
            }
            Err(e) => {
                tracing::error!(client_id = %client_id, error = %e, "Client lookup failed");
                return Err(FatalFailure::server_error());
            }
        };

        let key = parse_signing_key(&client.signing_key).map_err(|e| {
            tracing::warn!(client_id = %client_id, error = %e, "Stored client signing key is invalid");
            FatalFailure::key_parse_failure()
        })?;

        if request.header.alg != REQUIRED_ALGORITHM_NAME {
            tracing::debug!(
                client_id = %client_id,
                alg = %request.header.alg,
                "Request object signed with unexpected algorithm"
            );
            return Err(FatalFailure::algorithm_mismatch());
        }

        // Claim semantics are checked later, in a fixed order of their own.
        let mut validation = Validation::new(REQUIRED_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data =
            jsonwebtoken::decode::<Map<String, Value>>(&request.token, &key, &validation).map_err(
                |e| {
                    tracing::debug!(client_id = %client_id, error = %e, "Request object verification failed");
                    match e.kind() {
                        ErrorKind::Json(_) => FatalFailure::redirect_uri_unparseable(),
                        _ => FatalFailure::signature_invalid(),
                    }
                },
            )?;

        Ok(VerifiedRequestObject {
            client,
            payload: token_data.claims,
        })
    }
}
