//! Credential issuer configuration.
//!
//! Covers the shared audience, request object validation policy, the
//! registered clients, authorization code lifetime and key locations.
//!
//! # Example (TOML)
//!
//! ```toml
//! [issuer]
//! audience = "https://passport.cri.example.com"
//!
//! [issuer.jar]
//! max_token_ttl = "25m"
//! ttl_policy = "from_now"
//! decryption_key_path = "/etc/passport-cri/jar-decryption.pem"
//!
//! [issuer.credential]
//! signing_key_path = "/etc/passport-cri/vc-signing.pem"
//!
//! [issuer.clients.ipv-core]
//! issuer = "ipv-core"
//! redirect_uris = ["https://ipv.example.com/callback"]
//! signing_key = '{"kty":"EC","crv":"P-256","x":"...","y":"..."}'
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::jar::TtlPolicy;

/// Root configuration of the credential issuer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Audience value every authorization request must carry.
    pub audience: String,

    /// Request object validation settings.
    pub jar: JarConfig,

    /// Authorization code settings.
    pub auth_code: AuthCodeConfig,

    /// Verifiable credential signing settings.
    pub credential: CredentialConfig,

    /// Registered clients keyed by client id.
    pub clients: BTreeMap<String, ClientConfig>,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            audience: "http://localhost:8080".to_string(),
            jar: JarConfig::default(),
            auth_code: AuthCodeConfig::default(),
            credential: CredentialConfig::default(),
            clients: BTreeMap::new(),
        }
    }
}

/// Request object (JAR) validation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JarConfig {
    /// Longest accepted request object lifetime.
    #[serde(with = "humantime_serde")]
    pub max_token_ttl: Duration,

    /// How the request object lifetime is measured.
    pub ttl_policy: TtlPolicy,

    /// Leeway applied to the `exp` and `nbf` comparisons.
    #[serde(with = "humantime_serde")]
    pub clock_skew: Duration,

    /// PEM file holding the RSA key used to unwrap request object content keys.
    pub decryption_key_path: Option<PathBuf>,
}

impl Default for JarConfig {
    fn default() -> Self {
        Self {
            max_token_ttl: Duration::from_secs(1500),
            ttl_policy: TtlPolicy::default(),
            clock_skew: Duration::ZERO,
            decryption_key_path: None,
        }
    }
}

/// Upper bound on [`AuthCodeConfig::expiry`].
pub const MAX_AUTH_CODE_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Authorization code settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthCodeConfig {
    /// How long an issued code stays redeemable.
    #[serde(with = "humantime_serde")]
    pub expiry: Duration,
}

impl Default for AuthCodeConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::from_secs(600),
        }
    }
}

/// Verifiable credential signing settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// PEM file holding the RSA private key used to sign credentials.
    pub signing_key_path: Option<PathBuf>,

    /// Key id placed in the credential header.
    pub kid: Option<String>,
}

/// A registered client.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Expected `iss` claim of the client's request objects.
    pub issuer: String,

    /// The client's current request signing key as a JWK JSON document.
    pub signing_key: String,

    /// Redirect URIs the client registered.
    pub redirect_uris: Vec<String>,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl IssuerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audience.is_empty() {
            return Err(ConfigError::Missing("issuer.audience".to_string()));
        }

        if self.jar.max_token_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "issuer.jar.max_token_ttl must be > 0".to_string(),
            ));
        }

        if self.auth_code.expiry.is_zero() {
            return Err(ConfigError::InvalidValue(
                "issuer.auth_code.expiry must be > 0".to_string(),
            ));
        }
        if self.auth_code.expiry > MAX_AUTH_CODE_EXPIRY {
            return Err(ConfigError::InvalidValue(
                "issuer.auth_code.expiry must not exceed 24h".to_string(),
            ));
        }

        if self.clients.is_empty() {
            return Err(ConfigError::Missing(
                "issuer.clients must register at least one client".to_string(),
            ));
        }

        for (client_id, client) in &self.clients {
            if client.issuer.is_empty() {
                return Err(ConfigError::Missing(format!(
                    "issuer.clients.{client_id}.issuer"
                )));
            }
            if client.redirect_uris.is_empty() {
                return Err(ConfigError::Missing(format!(
                    "issuer.clients.{client_id}.redirect_uris"
                )));
            }
        }

        Ok(())
    }
}
