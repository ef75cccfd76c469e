//! Authorization request claim validation.
//!
//! Validation is an ordered list of pure checks folded with short-circuit.
//! The redirect URI checks run first; until they pass there is nowhere safe
//! to send an error, so their failures are fatal. Every later check reports a
//! recoverable failure carrying the trusted redirect URI.
//!
//! Order:
//! 1. `redirect_uri` is present and is an absolute URI
//! 2. `redirect_uri` is registered for the client
//! 3. required claims are present
//! 4. audience
//! 5. issuer
//! 6. response type
//! 7. expiry, not-before and lifetime

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::storage::ClientTrustConfig;

use super::outcome::{
    FatalFailure, RecoverableFailure, RecoverableReason, TrustedRedirectUri, ValidatedRequest,
    ValidationOutcome,
};

/// The only accepted `response_type`.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Claims that must be present, in the order they are reported.
pub const REQUIRED_CLAIMS: [&str; 6] = ["exp", "iat", "iss", "nbf", "response_type", "sub"];

// =============================================================================
// Claims
// =============================================================================

/// Audience claim can be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// Single string audience.
    String(String),
    /// Array of audience strings.
    Array(Vec<String>),
}

impl Audience {
    /// Checks if the audience contains the specified value.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::String(s) => s == value,
            Self::Array(arr) => arr.iter().any(|s| s == value),
        }
    }

    /// Returns every audience value.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::String(s) => vec![s.as_str()],
            Self::Array(arr) => arr.iter().map(String::as_str).collect(),
        }
    }
}

/// Claim set of an authorization request object.
///
/// Every registered claim is optional so that absence is reported by the
/// required-claims check rather than as a parse error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequestClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Expiration time as Unix timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not-before time as Unix timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued-at time as Unix timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Claims with no meaning to the validator, passed through untouched.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl AuthorizationRequestClaims {
    /// Parses a verified JWT payload.
    ///
    /// # Errors
    ///
    /// Returns a fatal failure if a registered claim has the wrong type.
    pub fn from_payload(payload: Map<String, Value>) -> Result<Self, FatalFailure> {
        serde_json::from_value(Value::Object(payload)).map_err(|e| {
            tracing::debug!(error = %e, "Request object claim set could not be parsed");
            FatalFailure::redirect_uri_unparseable()
        })
    }

    fn missing_required_claims(&self) -> Vec<&'static str> {
        REQUIRED_CLAIMS
            .into_iter()
            .filter(|name| match *name {
                "exp" => self.exp.is_none(),
                "iat" => self.iat.is_none(),
                "iss" => self.iss.is_none(),
                "nbf" => self.nbf.is_none(),
                "response_type" => self.response_type.is_none(),
                "sub" => self.sub.is_none(),
                _ => false,
            })
            .collect()
    }
}

// =============================================================================
// Validation context
// =============================================================================

/// How the lifetime of a request object is measured against the maximum TTL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlPolicy {
    /// `exp - now`.
    #[default]
    FromNow,
    /// `exp - iat`.
    FromIssuedAt,
}

/// Inputs shared by every check.
#[derive(Debug, Clone, Copy)]
pub struct ClaimsContext<'a> {
    /// Trust configuration of the requesting client.
    pub client: &'a ClientTrustConfig,
    /// Current time as Unix timestamp.
    pub now: i64,
    /// How lifetime is measured.
    pub ttl_policy: TtlPolicy,
    /// Leeway applied to `exp` and `nbf`, in seconds.
    pub clock_skew: i64,
}

impl<'a> ClaimsContext<'a> {
    /// Creates a context evaluated at `now`.
    #[must_use]
    pub fn new(
        client: &'a ClientTrustConfig,
        now: OffsetDateTime,
        ttl_policy: TtlPolicy,
        clock_skew: Duration,
    ) -> Self {
        Self {
            client,
            now: now.unix_timestamp(),
            ttl_policy,
            clock_skew: i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX),
        }
    }

    fn max_ttl(&self) -> i64 {
        i64::try_from(self.client.max_token_ttl.as_secs()).unwrap_or(i64::MAX)
    }
}

// =============================================================================
// Checks
// =============================================================================

/// A post-trust check failure, before the redirect target is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRejection {
    /// Which check failed.
    pub reason: RecoverableReason,
    /// Human readable description.
    pub description: String,
}

impl ClaimRejection {
    fn new(reason: RecoverableReason, description: impl Into<String>) -> Self {
        Self {
            reason,
            description: description.into(),
        }
    }
}

/// A check that runs once the redirect URI is trusted.
pub type ClaimCheck = fn(&AuthorizationRequestClaims, &ClaimsContext<'_>) -> Result<(), ClaimRejection>;

/// Post-trust checks in evaluation order.
pub const CLAIM_CHECKS: [(&str, ClaimCheck); 5] = [
    ("required_claims", check_required_claims),
    ("audience", check_audience),
    ("issuer", check_issuer),
    ("response_type", check_response_type),
    ("time_bounds", check_time_bounds),
];

/// Steps 1 and 2: the redirect URI must parse and be registered.
///
/// # Errors
///
/// Returns a fatal failure; no redirect target is known yet.
pub fn trust_redirect_uri(
    claims: &AuthorizationRequestClaims,
    client: &ClientTrustConfig,
) -> Result<TrustedRedirectUri, FatalFailure> {
    let redirect_uri = claims
        .redirect_uri
        .as_deref()
        .ok_or_else(FatalFailure::redirect_uri_unparseable)?;

    url::Url::parse(redirect_uri).map_err(|e| {
        tracing::debug!(error = %e, "redirect_uri claim is not an absolute URI");
        FatalFailure::redirect_uri_unparseable()
    })?;

    if !client.is_registered_redirect(redirect_uri) {
        tracing::debug!(
            client_id = %client.client_id,
            redirect_uri = %redirect_uri,
            "redirect_uri claim is not registered"
        );
        return Err(FatalFailure::redirect_uri_unregistered());
    }

    Ok(TrustedRedirectUri::new(redirect_uri))
}

fn check_required_claims(
    claims: &AuthorizationRequestClaims,
    _ctx: &ClaimsContext<'_>,
) -> Result<(), ClaimRejection> {
    let missing = claims.missing_required_claims();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ClaimRejection::new(
        RecoverableReason::MissingClaims,
        format!("JWT missing required claims: [{}]", missing.join(", ")),
    ))
}

fn check_audience(
    claims: &AuthorizationRequestClaims,
    ctx: &ClaimsContext<'_>,
) -> Result<(), ClaimRejection> {
    match &claims.aud {
        None => Err(ClaimRejection::new(
            RecoverableReason::AudienceRejected,
            "JWT missing required audience",
        )),
        Some(aud) if aud.contains(&ctx.client.audience) => Ok(()),
        Some(aud) => Err(ClaimRejection::new(
            RecoverableReason::AudienceRejected,
            format!("JWT audience rejected: [{}]", aud.values().join(", ")),
        )),
    }
}

fn check_issuer(
    claims: &AuthorizationRequestClaims,
    ctx: &ClaimsContext<'_>,
) -> Result<(), ClaimRejection> {
    let iss = claims.iss.as_deref().unwrap_or_default();
    if iss == ctx.client.issuer {
        return Ok(());
    }
    Err(ClaimRejection::new(
        RecoverableReason::IssuerMismatch,
        format!(
            "JWT iss claim has value {}, must be {}",
            iss, ctx.client.issuer
        ),
    ))
}

fn check_response_type(
    claims: &AuthorizationRequestClaims,
    _ctx: &ClaimsContext<'_>,
) -> Result<(), ClaimRejection> {
    let response_type = claims.response_type.as_deref().unwrap_or_default();
    if response_type == RESPONSE_TYPE_CODE {
        return Ok(());
    }
    Err(ClaimRejection::new(
        RecoverableReason::ResponseTypeMismatch,
        format!(
            "JWT response_type claim has value {}, must be {}",
            response_type, RESPONSE_TYPE_CODE
        ),
    ))
}

fn check_time_bounds(
    claims: &AuthorizationRequestClaims,
    ctx: &ClaimsContext<'_>,
) -> Result<(), ClaimRejection> {
    let (Some(exp), Some(nbf), Some(iat)) = (claims.exp, claims.nbf, claims.iat) else {
        return Err(ClaimRejection::new(
            RecoverableReason::MissingClaims,
            "JWT missing required claims",
        ));
    };

    if ctx.now.saturating_sub(ctx.clock_skew) > exp {
        return Err(ClaimRejection::new(RecoverableReason::Expired, "Expired JWT"));
    }

    if ctx.now.saturating_add(ctx.clock_skew) < nbf {
        return Err(ClaimRejection::new(
            RecoverableReason::NotYetValid,
            "JWT before use time",
        ));
    }

    let lifetime = match ctx.ttl_policy {
        TtlPolicy::FromNow => exp.saturating_sub(ctx.now),
        TtlPolicy::FromIssuedAt => exp.saturating_sub(iat),
    };
    if lifetime > ctx.max_ttl() {
        return Err(ClaimRejection::new(
            RecoverableReason::TtlExceeded,
            "The client JWT expiry date has surpassed the maximum allowed ttl value",
        ));
    }

    Ok(())
}

// =============================================================================
// Validator
// =============================================================================

/// Runs the claim checks for one request object.
pub struct ClaimsValidator;

impl ClaimsValidator {
    /// Validates `claims` for the client in `ctx`.
    #[must_use]
    pub fn validate(claims: AuthorizationRequestClaims, ctx: &ClaimsContext<'_>) -> ValidationOutcome {
        let redirect_uri = match trust_redirect_uri(&claims, ctx.client) {
            Ok(uri) => uri,
            Err(failure) => return ValidationOutcome::Fatal(failure),
        };

        let result = CLAIM_CHECKS.iter().try_for_each(|(name, check)| {
            check(&claims, ctx).inspect_err(|rejection| {
                tracing::debug!(
                    check = %name,
                    description = %rejection.description,
                    "Request object claim check failed"
                );
            })
        });

        match result {
            Ok(()) => ValidationOutcome::Valid(ValidatedRequest {
                client_id: ctx.client.client_id.clone(),
                claims,
                redirect_uri,
            }),
            Err(rejection) => ValidationOutcome::Recoverable(RecoverableFailure {
                reason: rejection.reason,
                description: rejection.description,
                redirect_uri,
                state: claims.state,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jar::{FatalReason, JarErrorCode};

    const NOW: i64 = 1_700_000_000;

    fn client() -> ClientTrustConfig {
        ClientTrustConfig {
            client_id: "test-client-id".to_string(),
            issuer: "test-issuer".to_string(),
            audience: "test-audience".to_string(),
            signing_key: String::new(),
            redirect_uris: vec!["https://example.com".to_string()],
            max_token_ttl: Duration::from_secs(1500),
        }
    }

    fn valid_claims() -> AuthorizationRequestClaims {
        AuthorizationRequestClaims {
            iss: Some("test-issuer".to_string()),
            sub: Some("test-subject".to_string()),
            aud: Some(Audience::String("test-audience".to_string())),
            exp: Some(NOW + 900),
            nbf: Some(NOW),
            iat: Some(NOW),
            response_type: Some("code".to_string()),
            client_id: Some("test-client-id".to_string()),
            redirect_uri: Some("https://example.com".to_string()),
            state: Some("af0ifjsldkj".to_string()),
            additional: Map::new(),
        }
    }

    fn validate(claims: AuthorizationRequestClaims) -> ValidationOutcome {
        validate_with(claims, TtlPolicy::FromNow)
    }

    fn validate_with(claims: AuthorizationRequestClaims, policy: TtlPolicy) -> ValidationOutcome {
        let client = client();
        let now = OffsetDateTime::from_unix_timestamp(NOW).unwrap();
        let ctx = ClaimsContext::new(&client, now, policy, Duration::ZERO);
        ClaimsValidator::validate(claims, &ctx)
    }

    fn recoverable(outcome: ValidationOutcome) -> RecoverableFailure {
        match outcome {
            ValidationOutcome::Recoverable(failure) => failure,
            other => panic!("expected recoverable failure, got {other:?}"),
        }
    }

    fn fatal(outcome: ValidationOutcome) -> FatalFailure {
        match outcome {
            ValidationOutcome::Fatal(failure) => failure,
            other => panic!("expected fatal failure, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_claims() {
        let outcome = validate(valid_claims());
        let ValidationOutcome::Valid(request) = outcome else {
            panic!("expected valid outcome");
        };
        assert_eq!(request.client_id, "test-client-id");
        assert_eq!(request.redirect_uri.as_str(), "https://example.com");
        assert_eq!(request.claims.sub.as_deref(), Some("test-subject"));
    }

    #[test]
    fn test_missing_redirect_uri_is_fatal() {
        let mut claims = valid_claims();
        claims.redirect_uri = None;
        let failure = fatal(validate(claims));
        assert_eq!(failure.reason, FatalReason::RequestObjectInvalid);
        assert_eq!(
            failure.description,
            "Failed to parse JWT claim set in order to access redirect_uri claim"
        );
    }

    #[test]
    fn test_unparseable_redirect_uri_is_fatal() {
        let mut claims = valid_claims();
        claims.redirect_uri = Some("({[]})./sd-234345////invalid-redirect-uri".to_string());
        let failure = fatal(validate(claims));
        assert_eq!(failure.error_code(), JarErrorCode::InvalidRequestObject);
    }

    #[test]
    fn test_relative_redirect_uri_is_fatal_even_when_registered() {
        let relative = ["/callback", "callback", "//example.com/callback"];
        let mut client = client();
        client.redirect_uris = relative.iter().map(ToString::to_string).collect();

        for uri in relative {
            let mut claims = valid_claims();
            claims.redirect_uri = Some(uri.to_string());
            let failure = trust_redirect_uri(&claims, &client).unwrap_err();
            assert_eq!(failure.reason, FatalReason::RequestObjectInvalid);
        }
    }

    #[test]
    fn test_unregistered_redirect_uri_is_fatal_invalid_grant() {
        let mut claims = valid_claims();
        claims.redirect_uri = Some("https://evil.example.com".to_string());
        let failure = fatal(validate(claims));
        assert_eq!(failure.error_code(), JarErrorCode::InvalidGrant);
        assert_eq!(
            failure.description,
            "Invalid redirect_uri claim provided for configured client"
        );
    }

    #[test]
    fn test_redirect_checked_before_everything_else() {
        let claims = AuthorizationRequestClaims {
            redirect_uri: Some("https://evil.example.com".to_string()),
            ..AuthorizationRequestClaims::default()
        };
        let failure = fatal(validate(claims));
        assert_eq!(failure.reason, FatalReason::InvalidGrant);
    }

    #[test]
    fn test_missing_required_claims_are_sorted_and_aggregated() {
        let claims = AuthorizationRequestClaims {
            aud: Some(Audience::String("test-audience".to_string())),
            redirect_uri: Some("https://example.com".to_string()),
            ..AuthorizationRequestClaims::default()
        };
        let failure = recoverable(validate(claims));
        assert_eq!(failure.reason, RecoverableReason::MissingClaims);
        assert_eq!(
            failure.description,
            "JWT missing required claims: [exp, iat, iss, nbf, response_type, sub]"
        );
        assert_eq!(failure.redirect_uri.as_str(), "https://example.com");
        assert_eq!(failure.error_code(), JarErrorCode::InvalidGrant);
        assert!(failure.state.is_none());
    }

    #[test]
    fn test_single_missing_claim() {
        let mut claims = valid_claims();
        claims.nbf = None;
        let failure = recoverable(validate(claims));
        assert_eq!(failure.description, "JWT missing required claims: [nbf]");
        assert_eq!(failure.state.as_deref(), Some("af0ifjsldkj"));
    }

    #[test]
    fn test_audience_rejected() {
        let mut claims = valid_claims();
        claims.aud = Some(Audience::String("invalid-audience".to_string()));
        let failure = recoverable(validate(claims));
        assert_eq!(failure.reason, RecoverableReason::AudienceRejected);
        assert_eq!(failure.description, "JWT audience rejected: [invalid-audience]");
    }

    #[test]
    fn test_audience_array() {
        let mut claims = valid_claims();
        claims.aud = Some(Audience::Array(vec![
            "other".to_string(),
            "test-audience".to_string(),
        ]));
        assert!(validate(claims).is_valid());

        let mut claims = valid_claims();
        claims.aud = Some(Audience::Array(vec!["a".to_string(), "b".to_string()]));
        let failure = recoverable(validate(claims));
        assert_eq!(failure.description, "JWT audience rejected: [a, b]");
    }

    #[test]
    fn test_missing_audience() {
        let mut claims = valid_claims();
        claims.aud = None;
        let failure = recoverable(validate(claims));
        assert_eq!(failure.description, "JWT missing required audience");
    }

    #[test]
    fn test_issuer_mismatch() {
        let mut claims = valid_claims();
        claims.iss = Some("invalid-issuer".to_string());
        let failure = recoverable(validate(claims));
        assert_eq!(failure.reason, RecoverableReason::IssuerMismatch);
        assert_eq!(
            failure.description,
            "JWT iss claim has value invalid-issuer, must be test-issuer"
        );
    }

    #[test]
    fn test_response_type_mismatch() {
        let mut claims = valid_claims();
        claims.response_type = Some("invalid-response-type".to_string());
        let failure = recoverable(validate(claims));
        assert_eq!(
            failure.description,
            "JWT response_type claim has value invalid-response-type, must be code"
        );
    }

    #[test]
    fn test_expired() {
        let mut claims = valid_claims();
        claims.exp = Some(NOW - 1);
        let failure = recoverable(validate(claims));
        assert_eq!(failure.reason, RecoverableReason::Expired);
        assert_eq!(failure.description, "Expired JWT");
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let mut claims = valid_claims();
        claims.exp = Some(NOW);
        assert!(validate(claims).is_valid());
    }

    #[test]
    fn test_not_yet_valid() {
        let mut claims = valid_claims();
        claims.nbf = Some(NOW + 60);
        let failure = recoverable(validate(claims));
        assert_eq!(failure.reason, RecoverableReason::NotYetValid);
        assert_eq!(failure.description, "JWT before use time");
    }

    #[test]
    fn test_ttl_exceeded() {
        let mut claims = valid_claims();
        claims.exp = Some(NOW + 100 * 365 * 24 * 3600);
        let failure = recoverable(validate(claims));
        assert_eq!(failure.reason, RecoverableReason::TtlExceeded);
        assert_eq!(
            failure.description,
            "The client JWT expiry date has surpassed the maximum allowed ttl value"
        );
    }

    #[test]
    fn test_ttl_policy_from_issued_at() {
        // issued long ago, expiring soon: fine from now, too long from iat
        let mut claims = valid_claims();
        claims.iat = Some(NOW - 3600);
        claims.nbf = Some(NOW - 3600);
        claims.exp = Some(NOW + 60);

        assert!(validate_with(claims.clone(), TtlPolicy::FromNow).is_valid());
        let failure = recoverable(validate_with(claims, TtlPolicy::FromIssuedAt));
        assert_eq!(failure.reason, RecoverableReason::TtlExceeded);
    }

    #[test]
    fn test_clock_skew_widens_bounds() {
        let client = client();
        let now = OffsetDateTime::from_unix_timestamp(NOW).unwrap();
        let ctx = ClaimsContext::new(&client, now, TtlPolicy::FromNow, Duration::from_secs(30));

        let mut claims = valid_claims();
        claims.exp = Some(NOW - 10);
        claims.nbf = Some(NOW - 20);
        assert!(ClaimsValidator::validate(claims, &ctx).is_valid());
    }

    #[test]
    fn test_first_failing_check_wins() {
        let mut claims = valid_claims();
        claims.aud = Some(Audience::String("invalid-audience".to_string()));
        claims.iss = Some("invalid-issuer".to_string());
        claims.exp = Some(NOW - 1);
        let failure = recoverable(validate(claims));
        assert_eq!(failure.reason, RecoverableReason::AudienceRejected);
    }

    #[test]
    fn test_from_payload_rejects_wrongly_typed_claims() {
        let payload = serde_json::json!({ "exp": "tomorrow", "redirect_uri": "https://example.com" });
        let Value::Object(map) = payload else {
            panic!("expected object");
        };
        let failure = AuthorizationRequestClaims::from_payload(map).unwrap_err();
        assert_eq!(failure.reason, FatalReason::RequestObjectInvalid);
    }

    #[test]
    fn test_from_payload_keeps_additional_claims() {
        let payload = serde_json::json!({
            "sub": "test-subject",
            "shared_claims": { "name": "Paul" }
        });
        let Value::Object(map) = payload else {
            panic!("expected object");
        };
        let claims = AuthorizationRequestClaims::from_payload(map).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("test-subject"));
        assert!(claims.additional.contains_key("shared_claims"));
    }
}
