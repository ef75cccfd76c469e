//! End-to-end validation of encrypted authorization request objects.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::config::JarConfig;
use crate::storage::{ClientConfigStore, ClientTrustConfig};

use super::claims::{AuthorizationRequestClaims, ClaimsContext, ClaimsValidator, TtlPolicy};
use super::decrypt::{KeyManagementService, RequestDecryptor};
use super::outcome::{FatalFailure, ValidationOutcome};
use super::signature::SignatureVerifier;

/// Decrypts, verifies and validates authorization request objects.
///
/// Stateless: one instance serves every request.
pub struct JarValidator {
    decryptor: RequestDecryptor,
    verifier: SignatureVerifier,
    ttl_policy: TtlPolicy,
    clock_skew: Duration,
}

impl JarValidator {
    /// Creates a validator.
    ///
    /// # Arguments
    /// * `key_management` - Decrypts the request object
    /// * `clients` - Resolves client trust configuration
    /// * `config` - Lifetime policy and clock skew
    #[must_use]
    pub fn new(
        key_management: Arc<dyn KeyManagementService>,
        clients: Arc<dyn ClientConfigStore>,
        config: &JarConfig,
    ) -> Self {
        Self {
            decryptor: RequestDecryptor::new(key_management),
            verifier: SignatureVerifier::new(clients),
            ttl_policy: config.ttl_policy,
            clock_skew: config.clock_skew,
        }
    }

    /// Validates `request_jwe` as sent by `client_id`, at the current time.
    #[tracing::instrument(name = "jar.validate", skip_all, fields(client_id = %client_id))]
    pub async fn validate(&self, request_jwe: &str, client_id: &str) -> ValidationOutcome {
        self.validate_at(request_jwe, client_id, OffsetDateTime::now_utc())
            .await
    }

    /// Validates `request_jwe` as sent by `client_id`, as of `now`.
    pub async fn validate_at(
        &self,
        request_jwe: &str,
        client_id: &str,
        now: OffsetDateTime,
    ) -> ValidationOutcome {
        let (client, claims) = match self.verified_claims(request_jwe, client_id).await {
            Ok(verified) => verified,
            Err(failure) => {
                tracing::info!(
                    error = %failure.error_code(),
                    description = %failure.description,
                    "Request object rejected"
                );
                return ValidationOutcome::Fatal(failure);
            }
        };

        let ctx = ClaimsContext::new(&client, now, self.ttl_policy, self.clock_skew);
        let outcome = ClaimsValidator::validate(claims, &ctx);

        match &outcome {
            ValidationOutcome::Valid(_) => tracing::info!("Request object validated"),
            ValidationOutcome::Recoverable(failure) => tracing::info!(
                error = %failure.error_code(),
                description = %failure.description,
                "Request object claims rejected"
            ),
            ValidationOutcome::Fatal(failure) => tracing::info!(
                error = %failure.error_code(),
                description = %failure.description,
                "Request object rejected"
            ),
        }

        outcome
    }

    async fn verified_claims(
        &self,
        request_jwe: &str,
        client_id: &str,
    ) -> Result<(ClientTrustConfig, AuthorizationRequestClaims), FatalFailure> {
        let signed = self.decryptor.decrypt(request_jwe).await?;
        let verified = self.verifier.verify(&signed, client_id).await?;
        let claims = AuthorizationRequestClaims::from_payload(verified.payload)?;
        Ok((verified.client, claims))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use p256::SecretKey;
    use p256::elliptic_curve::sec1::ToEncodedPoint;
    use p256::pkcs8::{EncodePrivateKey, LineEnding};
    use rand::rngs::OsRng;
    use serde_json::{Value, json};

    use super::*;
    use crate::config::{ClientConfig, IssuerConfig};
    use crate::jar::{FatalReason, JweEnvelope, JweHeader, RecoverableReason};
    use crate::storage::memory::StaticClientConfig;
    use crate::{AuthError, AuthResult};

    /// Treats the ciphertext as the plaintext; lets these tests skip RSA.
    struct PassthroughKms;

    #[async_trait]
    impl KeyManagementService for PassthroughKms {
        async fn decrypt(&self, envelope: &JweEnvelope) -> AuthResult<Vec<u8>> {
            Ok(envelope.ciphertext.clone())
        }
    }

    struct FailingKms;

    #[async_trait]
    impl KeyManagementService for FailingKms {
        async fn decrypt(&self, _envelope: &JweEnvelope) -> AuthResult<Vec<u8>> {
            Err(AuthError::key_management("access denied"))
        }
    }

    fn wrap(jws: &str) -> String {
        let header = JweHeader {
            alg: "RSA-OAEP-256".to_string(),
            enc: "A256GCM".to_string(),
            typ: Some("JWE".to_string()),
            cty: None,
            kid: None,
        };
        JweEnvelope {
            encoded_header: URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap()),
            header,
            encrypted_key: vec![1],
            iv: vec![2; 12],
            ciphertext: jws.as_bytes().to_vec(),
            tag: vec![3; 16],
        }
        .to_compact()
    }

    struct Fixture {
        encoding_key: EncodingKey,
        validator: JarValidator,
    }

    fn fixture(kms: Arc<dyn KeyManagementService>) -> Fixture {
        let secret_key = SecretKey::random(&mut OsRng);
        let pem = secret_key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let point = secret_key.public_key().to_encoded_point(false);
        let jwk = json!({
            "kty": "EC",
            "crv": "P-256",
            "x": URL_SAFE_NO_PAD.encode(point.x().unwrap()),
            "y": URL_SAFE_NO_PAD.encode(point.y().unwrap()),
        });

        let mut config = IssuerConfig::default();
        config.audience = "test-audience".to_string();
        config.clients.insert(
            "test-client-id".to_string(),
            ClientConfig {
                issuer: "test-issuer".to_string(),
                signing_key: jwk.to_string(),
                redirect_uris: vec!["https://example.com".to_string()],
            },
        );

        Fixture {
            encoding_key: EncodingKey::from_ec_pem(pem.as_bytes()).unwrap(),
            validator: JarValidator::new(
                kms,
                Arc::new(StaticClientConfig::new(config.clone())),
                &config.jar,
            ),
        }
    }

    fn claims(now: i64) -> Value {
        json!({
            "iss": "test-issuer",
            "sub": "test-subject",
            "aud": "test-audience",
            "exp": now + 900,
            "nbf": now,
            "iat": now,
            "response_type": "code",
            "client_id": "test-client-id",
            "redirect_uri": "https://example.com",
            "state": "af0ifjsldkj",
        })
    }

    fn sign(fixture: &Fixture, claims: &Value) -> String {
        jsonwebtoken::encode(&Header::new(Algorithm::ES256), claims, &fixture.encoding_key)
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_request_object() {
        let fixture = fixture(Arc::new(PassthroughKms));
        let now = OffsetDateTime::now_utc();
        let jwe = wrap(&sign(&fixture, &claims(now.unix_timestamp())));

        let outcome = fixture.validator.validate_at(&jwe, "test-client-id", now).await;
        let ValidationOutcome::Valid(request) = outcome else {
            panic!("expected valid outcome, got {outcome:?}");
        };
        assert_eq!(request.claims.state.as_deref(), Some("af0ifjsldkj"));
    }

    #[tokio::test]
    async fn test_kms_failure_is_decryption_failure() {
        let fixture = fixture(Arc::new(FailingKms));
        let now = OffsetDateTime::now_utc();
        let jwe = wrap(&sign(&fixture, &claims(now.unix_timestamp())));

        let outcome = fixture.validator.validate_at(&jwe, "test-client-id", now).await;
        let ValidationOutcome::Fatal(failure) = outcome else {
            panic!("expected fatal outcome");
        };
        assert_eq!(failure.reason, FatalReason::DecryptionFailed);
    }

    #[tokio::test]
    async fn test_unknown_client_checked_before_claims() {
        let fixture = fixture(Arc::new(PassthroughKms));
        let now = OffsetDateTime::now_utc();
        let jwe = wrap(&sign(&fixture, &json!({ "redirect_uri": "https://evil.example.com" })));

        let outcome = fixture.validator.validate_at(&jwe, "other-client", now).await;
        let ValidationOutcome::Fatal(failure) = outcome else {
            panic!("expected fatal outcome");
        };
        assert_eq!(failure.reason, FatalReason::InvalidClient);
    }

    #[tokio::test]
    async fn test_expired_request_object_is_recoverable() {
        let fixture = fixture(Arc::new(PassthroughKms));
        let now = OffsetDateTime::now_utc();
        let mut claims = claims(now.unix_timestamp());
        claims["exp"] = json!(now.unix_timestamp() - 60);
        let jwe = wrap(&sign(&fixture, &claims));

        let outcome = fixture.validator.validate_at(&jwe, "test-client-id", now).await;
        let ValidationOutcome::Recoverable(failure) = outcome else {
            panic!("expected recoverable outcome");
        };
        assert_eq!(failure.reason, RecoverableReason::Expired);
        assert_eq!(failure.redirect_uri.as_str(), "https://example.com");
    }

    #[tokio::test]
    async fn test_non_object_payload_is_request_object_invalid() {
        let fixture = fixture(Arc::new(PassthroughKms));
        let now = OffsetDateTime::now_utc();
        let jwe = wrap(&sign(&fixture, &json!(["not", "an", "object"])));

        let outcome = fixture.validator.validate_at(&jwe, "test-client-id", now).await;
        let ValidationOutcome::Fatal(failure) = outcome else {
            panic!("expected fatal outcome");
        };
        assert_eq!(failure.reason, FatalReason::RequestObjectInvalid);
    }
}
