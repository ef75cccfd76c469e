//! Request object decryption.
//!
//! Authorization request objects arrive as compact JWEs whose payload is a
//! compact signed JWT. The content key is unwrapped by a
//! [`KeyManagementService`]; the issuer never sees which key did it.
//!
//! ## Supported algorithms
//!
//! - **Key management**: `RSA-OAEP-256`
//! - **Content encryption**: `A256GCM`, `A128GCM`

use std::fmt;
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{AuthError, AuthResult};

use super::outcome::FatalFailure;

/// The only key management algorithm accepted.
pub const KEY_MANAGEMENT_ALGORITHM: &str = "RSA-OAEP-256";

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while handling a JWE.
#[derive(Debug, thiserror::Error)]
pub enum JweError {
    /// The compact serialization is malformed.
    #[error("Malformed JWE: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
    },

    /// The header names an algorithm this issuer does not support.
    #[error("Unsupported JWE algorithm: {alg}")]
    UnsupportedAlgorithm {
        /// The `alg` or `enc` header value.
        alg: String,
    },

    /// The content key could not be unwrapped.
    #[error("Content key unwrap failed: {message}")]
    KeyUnwrap {
        /// Description of the failure.
        message: String,
    },

    /// Authenticated decryption of the content failed.
    #[error("Content decryption failed")]
    ContentDecryption,

    /// Encryption failed.
    #[error("Encryption failed: {message}")]
    Encryption {
        /// Description of the failure.
        message: String,
    },

    /// The key material is invalid.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JweError {
    fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }
}

impl From<JweError> for AuthError {
    fn from(err: JweError) -> Self {
        AuthError::key_management(err.to_string())
    }
}

// ============================================================================
// Content Encryption
// ============================================================================

/// Content encryption algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncryption {
    /// AES-128 in Galois/Counter Mode.
    A128Gcm,
    /// AES-256 in Galois/Counter Mode.
    A256Gcm,
}

impl ContentEncryption {
    /// Parses the `enc` header value.
    ///
    /// # Errors
    ///
    /// Returns an error for any other value.
    pub fn parse(enc: &str) -> Result<Self, JweError> {
        match enc {
            "A128GCM" => Ok(Self::A128Gcm),
            "A256GCM" => Ok(Self::A256Gcm),
            other => Err(JweError::UnsupportedAlgorithm {
                alg: other.to_string(),
            }),
        }
    }

    /// Returns the `enc` header value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A128Gcm => "A128GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    /// Content key length in bytes.
    #[must_use]
    pub fn key_len(&self) -> usize {
        match self {
            Self::A128Gcm => 16,
            Self::A256Gcm => 32,
        }
    }

    fn open(&self, cek: &[u8], iv: &[u8], aad: &[u8], sealed: &[u8]) -> Result<Vec<u8>, JweError> {
        match self {
            Self::A128Gcm => open_with::<Aes128Gcm>(cek, iv, aad, sealed),
            Self::A256Gcm => open_with::<Aes256Gcm>(cek, iv, aad, sealed),
        }
    }

    fn seal(&self, cek: &[u8], iv: &[u8], aad: &[u8], msg: &[u8]) -> Result<Vec<u8>, JweError> {
        match self {
            Self::A128Gcm => seal_with::<Aes128Gcm>(cek, iv, aad, msg),
            Self::A256Gcm => seal_with::<Aes256Gcm>(cek, iv, aad, msg),
        }
    }
}

impl fmt::Display for ContentEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn open_with<C: Aead + KeyInit>(
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    sealed: &[u8],
) -> Result<Vec<u8>, JweError> {
    if iv.len() != IV_LEN {
        return Err(JweError::malformed("Invalid initialization vector length"));
    }
    let cipher = C::new_from_slice(cek).map_err(|_| JweError::ContentDecryption)?;
    cipher
        .decrypt(aes_gcm::aead::Nonce::<C>::from_slice(iv), Payload { msg: sealed, aad })
        .map_err(|_| JweError::ContentDecryption)
}

fn seal_with<C: Aead + KeyInit>(
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    msg: &[u8],
) -> Result<Vec<u8>, JweError> {
    let cipher = C::new_from_slice(cek).map_err(|e| JweError::Encryption {
        message: e.to_string(),
    })?;
    cipher
        .encrypt(aes_gcm::aead::Nonce::<C>::from_slice(iv), Payload { msg, aad })
        .map_err(|e| JweError::Encryption {
            message: e.to_string(),
        })
}

// ============================================================================
// JWE Envelope
// ============================================================================

/// Protected header of a JWE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JweHeader {
    /// Key management algorithm.
    pub alg: String,

    /// Content encryption algorithm.
    pub enc: String,

    /// Media type of the complete JWE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Media type of the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,

    /// Id of the key the content key was wrapped with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// The five parts of a compact JWE, decoded.
#[derive(Debug, Clone)]
pub struct JweEnvelope {
    /// Parsed protected header.
    pub header: JweHeader,

    /// The protected header exactly as encoded; it is the AAD of the content.
    pub encoded_header: String,

    /// Wrapped content encryption key.
    pub encrypted_key: Vec<u8>,

    /// Initialization vector.
    pub iv: Vec<u8>,

    /// Encrypted payload.
    pub ciphertext: Vec<u8>,

    /// Authentication tag.
    pub tag: Vec<u8>,
}

impl JweEnvelope {
    /// Parses a compact JWE.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not have five base64url parts or
    /// the header is not valid JSON.
    pub fn parse(compact: &str) -> Result<Self, JweError> {
        let parts: Vec<&str> = compact.split('.').collect();
        if parts.len() != 5 {
            return Err(JweError::malformed(format!(
                "Expected 5 parts, found {}",
                parts.len()
            )));
        }

        let decode = |part: &str, name: &str| {
            URL_SAFE_NO_PAD
                .decode(part)
                .map_err(|_| JweError::malformed(format!("Invalid {name} encoding")))
        };

        let header_bytes = decode(parts[0], "header")?;
        let header: JweHeader = serde_json::from_slice(&header_bytes)
            .map_err(|_| JweError::malformed("Invalid header JSON"))?;

        Ok(Self {
            header,
            encoded_header: parts[0].to_string(),
            encrypted_key: decode(parts[1], "encrypted key")?,
            iv: decode(parts[2], "initialization vector")?,
            ciphertext: decode(parts[3], "ciphertext")?,
            tag: decode(parts[4], "authentication tag")?,
        })
    }

    /// Re-assembles the compact serialization.
    #[must_use]
    pub fn to_compact(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}",
            self.encoded_header,
            URL_SAFE_NO_PAD.encode(&self.encrypted_key),
            URL_SAFE_NO_PAD.encode(&self.iv),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
            URL_SAFE_NO_PAD.encode(&self.tag),
        )
    }
}

// ============================================================================
// Key Management
// ============================================================================

/// Holder of the issuer's request object decryption key.
///
/// Implementations may call out to an external key management service.
#[async_trait]
pub trait KeyManagementService: Send + Sync {
    /// Decrypts a JWE and returns its plaintext payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be decrypted.
    async fn decrypt(&self, envelope: &JweEnvelope) -> AuthResult<Vec<u8>>;
}

/// Local RSA-OAEP-256 decrypter with AES-GCM content decryption.
pub struct RsaOaepDecrypter {
    private_key: RsaPrivateKey,
}

impl RsaOaepDecrypter {
    /// Creates a decrypter for `private_key`.
    #[must_use]
    pub fn new(private_key: RsaPrivateKey) -> Self {
        Self { private_key }
    }

    /// Loads the private key from PKCS#8 or PKCS#1 PEM.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM data is invalid.
    pub fn from_pem(pem: &str) -> Result<Self, JweError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| JweError::invalid_key(e.to_string()))?;
        Ok(Self::new(private_key))
    }

    /// Returns the matching public key.
    #[must_use]
    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    fn decrypt_envelope(&self, envelope: &JweEnvelope) -> Result<Vec<u8>, JweError> {
        if envelope.header.alg != KEY_MANAGEMENT_ALGORITHM {
            return Err(JweError::UnsupportedAlgorithm {
                alg: envelope.header.alg.clone(),
            });
        }
        let enc = ContentEncryption::parse(&envelope.header.enc)?;

        let cek = self
            .private_key
            .decrypt(Oaep::new::<Sha256>(), &envelope.encrypted_key)
            .map_err(|e| JweError::KeyUnwrap {
                message: e.to_string(),
            })?;
        if cek.len() != enc.key_len() {
            return Err(JweError::KeyUnwrap {
                message: format!("Content key must be {} bytes for {}", enc.key_len(), enc),
            });
        }
        if envelope.tag.len() != TAG_LEN {
            return Err(JweError::malformed("Invalid authentication tag length"));
        }

        let mut sealed = Vec::with_capacity(envelope.ciphertext.len() + envelope.tag.len());
        sealed.extend_from_slice(&envelope.ciphertext);
        sealed.extend_from_slice(&envelope.tag);

        enc.open(
            &cek,
            &envelope.iv,
            envelope.encoded_header.as_bytes(),
            &sealed,
        )
    }
}

#[async_trait]
impl KeyManagementService for RsaOaepDecrypter {
    async fn decrypt(&self, envelope: &JweEnvelope) -> AuthResult<Vec<u8>> {
        self.decrypt_envelope(envelope).map_err(AuthError::from)
    }
}

/// Client-side counterpart of [`RsaOaepDecrypter`].
pub struct RsaOaepEncrypter {
    public_key: RsaPublicKey,
    enc: ContentEncryption,
}

impl RsaOaepEncrypter {
    /// Creates an encrypter for the issuer's public key.
    #[must_use]
    pub fn new(public_key: RsaPublicKey, enc: ContentEncryption) -> Self {
        Self { public_key, enc }
    }

    /// Loads the issuer's public key from SPKI PEM.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM data is invalid.
    pub fn from_public_key_pem(pem: &str, enc: ContentEncryption) -> Result<Self, JweError> {
        let public_key =
            RsaPublicKey::from_public_key_pem(pem).map_err(|e| JweError::invalid_key(e.to_string()))?;
        Ok(Self::new(public_key, enc))
    }

    /// Encrypts a compact signed JWT into a compact JWE.
    ///
    /// # Errors
    ///
    /// Returns an error if key wrapping or content encryption fails.
    pub fn encrypt(&self, signed_jwt: &str) -> Result<String, JweError> {
        let header = JweHeader {
            alg: KEY_MANAGEMENT_ALGORITHM.to_string(),
            enc: self.enc.as_str().to_string(),
            typ: Some("JWE".to_string()),
            cty: Some("JWT".to_string()),
            kid: None,
        };
        let header_json = serde_json::to_vec(&header).map_err(|e| JweError::Encryption {
            message: e.to_string(),
        })?;
        let encoded_header = URL_SAFE_NO_PAD.encode(header_json);

        let mut cek = vec![0u8; self.enc.key_len()];
        OsRng.fill_bytes(&mut cek);
        let mut iv = vec![0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut sealed = self.enc.seal(
            &cek,
            &iv,
            encoded_header.as_bytes(),
            signed_jwt.as_bytes(),
        )?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        let encrypted_key = self
            .public_key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &cek)
            .map_err(|e| JweError::Encryption {
                message: e.to_string(),
            })?;

        Ok(JweEnvelope {
            header,
            encoded_header,
            encrypted_key,
            iv,
            ciphertext: sealed,
            tag,
        }
        .to_compact())
    }
}

// ============================================================================
// Request Decryptor
// ============================================================================

/// Header of a decrypted request object.
///
/// `alg` is kept as sent so that any value, known to `jsonwebtoken` or not,
/// reaches the algorithm check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    /// Signing algorithm named by the client.
    pub alg: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl JwsHeader {
    /// Decodes the header segment of a compact JWS.
    fn from_compact(token: &str) -> Option<Self> {
        let segment = token.split('.').next()?;
        let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// A decrypted request object whose signature has not been checked yet.
#[derive(Debug, Clone)]
pub struct SignedRequestObject {
    /// Compact JWS.
    pub token: String,

    /// Its decoded header.
    pub header: JwsHeader,
}

/// Turns an encrypted request object into a signed one.
pub struct RequestDecryptor {
    key_management: Arc<dyn KeyManagementService>,
}

impl RequestDecryptor {
    /// Creates a decryptor backed by `key_management`.
    #[must_use]
    pub fn new(key_management: Arc<dyn KeyManagementService>) -> Self {
        Self { key_management }
    }

    /// Decrypts `jwe` and parses the payload as a signed JWT.
    ///
    /// Every failure is reported the same way; no inner claim is exposed.
    ///
    /// # Errors
    ///
    /// Returns a decryption failure if the JWE is malformed, the key
    /// management service rejects it, or the payload is not a signed JWT.
    pub async fn decrypt(&self, jwe: &str) -> Result<SignedRequestObject, FatalFailure> {
        let envelope = JweEnvelope::parse(jwe).map_err(|e| {
            tracing::debug!(error = %e, "Request object is not a valid JWE");
            FatalFailure::decryption_failed()
        })?;

        let plaintext = self.key_management.decrypt(&envelope).await.map_err(|e| {
            tracing::warn!(error = %e, "Request object decryption failed");
            FatalFailure::decryption_failed()
        })?;

        let token = String::from_utf8(plaintext).map_err(|_| {
            tracing::debug!("Decrypted request object is not UTF-8");
            FatalFailure::decryption_failed()
        })?;

        if token.split('.').count() != 3 {
            tracing::debug!("Decrypted request object is not a compact JWS");
            return Err(FatalFailure::decryption_failed());
        }

        let header = JwsHeader::from_compact(&token).ok_or_else(|| {
            tracing::debug!("Decrypted request object has no valid JWS header");
            FatalFailure::decryption_failed()
        })?;

        Ok(SignedRequestObject { token, header })
    }
}
