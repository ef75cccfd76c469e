//! JWT signing and verification primitives.
//!
//! Issued verifiable credentials are signed with RS256. The same error type
//! covers the ES256 verification keys registered for clients.
//!
//! ## Example
//!
//! ```ignore
//! use passport_cri_auth::token::jwt::CredentialSigner;
//!
//! let signer = CredentialSigner::from_pem(&std::fs::read_to_string("vc-signing.pem")?, None)?;
//! let jwt = signer.sign(&claims)?;
//! ```

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use serde::Serialize;
use serde::de::DeserializeOwned;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a key-related error.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGenerationError { .. } | Self::InvalidKey { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => Self::invalid_key(err.to_string()),
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

impl From<JwtError> for crate::AuthError {
    fn from(err: JwtError) -> Self {
        if err.is_key_error() {
            Self::key_management(err.to_string())
        } else {
            Self::signing(err.to_string())
        }
    }
}

// ============================================================================
// Credential Signer
// ============================================================================

/// The algorithm issued credentials are signed with.
pub const CREDENTIAL_SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// Signs issued credentials with an RSA private key.
///
/// Thread-safe (`Send + Sync`); one instance is shared by all requests.
pub struct CredentialSigner {
    kid: Option<String>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl CredentialSigner {
    /// Generates a fresh 2048-bit RSA signing key.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate(kid: Option<String>) -> Result<Self, JwtError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        Self::from_private_key(&private_key, kid)
    }

    /// Loads the signing key from a PKCS#8 or PKCS#1 PEM document.
    ///
    /// # Arguments
    /// * `pem` - PEM-encoded RSA private key
    /// * `kid` - Key id placed in the header of every credential
    ///
    /// # Errors
    /// Returns an error if the PEM data is not an RSA private key.
    pub fn from_pem(pem: &str, kid: Option<String>) -> Result<Self, JwtError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        Self::from_private_key(&private_key, kid)
    }

    fn from_private_key(private_key: &RsaPrivateKey, kid: Option<String>) -> Result<Self, JwtError> {
        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())?;

        let public_pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())?;

        Ok(Self {
            kid,
            encoding_key,
            decoding_key,
        })
    }

    /// Returns the key id, if one is configured.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Signs `claims` as a compact JWT with header `{"alg":"RS256","typ":"JWT"}`.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be serialized or signed.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let mut header = Header::new(CREDENTIAL_SIGNING_ALGORITHM);
        header.kid = self.kid.clone();

        jsonwebtoken::encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Verifies a credential this signer issued.
    ///
    /// Only the signature is checked; credentials carry no time claims.
    ///
    /// # Errors
    /// Returns an error if the signature does not verify or the claims do not
    /// deserialize into `T`.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<TokenData<T>, JwtError> {
        let mut validation = Validation::new(CREDENTIAL_SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode(token, &self.decoding_key, &validation).map_err(JwtError::from)
    }
}

// ============================================================================
// Tests
// ============================================================================
