//! Authorization endpoint.
//!
//! ```text
//! GET /authorization?client_id=...&request=<JWE>
//!     ├─► Missing parameter      → 400 invalid_request (JSON)
//!     ├─► Fatal failure          → JSON error, no redirect
//!     ├─► Recoverable failure    → 302 to redirect_uri with error parameters
//!     └─► Valid                  → persist code, 302 to redirect_uri with code
//! ```

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::audit::{self, AuditEventType, AuditSink};
use crate::error::AuthError;
use crate::jar::{JarValidator, ValidatedRequest, ValidationOutcome};
use crate::logging::{self, LogContext};
use crate::oauth::{AuthorizationCodeService, AuthorizationResponse};

/// Description returned when a required query parameter is absent.
pub const MISSING_PARAMETERS_DESCRIPTION: &str =
    "Missing required query parameters: client_id, request";

/// State for the authorize handler.
#[derive(Clone)]
pub struct AuthorizeState {
    /// Request object validation pipeline.
    pub validator: Arc<JarValidator>,
    /// Issues and persists authorization codes.
    pub codes: Arc<AuthorizationCodeService>,
    /// Receives the authorization requested event.
    pub audit: Arc<dyn AuditSink>,
}

/// Query parameters of the authorization request.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeParams {
    #[serde(default)]
    pub client_id: Option<String>,
    /// The encrypted request object.
    #[serde(default)]
    pub request: Option<String>,
}

/// GET /authorization handler.
pub async fn authorize_handler(
    State(state): State<AuthorizeState>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
    let (Some(client_id), Some(request)) =
        (non_empty(params.client_id), non_empty(params.request))
    else {
        return AuthError::invalid_request(MISSING_PARAMETERS_DESCRIPTION).into_response();
    };

    let span = LogContext::new()
        .with_client_id(client_id.as_str())
        .span("authorize");

    async move {
        match state.validator.validate(&request, &client_id).await {
            ValidationOutcome::Valid(validated) => issue_code(&state, validated)
                .await
                .unwrap_or_else(IntoResponse::into_response),
            ValidationOutcome::Recoverable(failure) => match failure.to_redirect_url() {
                Ok(location) => found(location),
                Err(e) => AuthError::internal(format!("Invalid redirect URI: {e}")).into_response(),
            },
            ValidationOutcome::Fatal(failure) => failure.into_response(),
        }
    }
    .instrument(span)
    .await
}

async fn issue_code(state: &AuthorizeState, validated: ValidatedRequest) -> Result<Response, AuthError> {
    let resource_id = Uuid::new_v4().to_string();
    logging::attach_session_id(&resource_id);
    let redirect_uri = validated.redirect_uri.as_str();

    let code = state.codes.generate_code();
    state.codes.persist(&code, &resource_id, redirect_uri).await?;

    tracing::info!(resource_id = %resource_id, "Authorization code issued");
    audit::emit(
        state.audit.as_ref(),
        AuditEventType::IpvPassportCriAuthorizationRequested,
    )
    .await;

    let location = AuthorizationResponse::new(code, validated.claims.state.clone())
        .to_redirect_url(redirect_uri)
        .map_err(|e| AuthError::internal(format!("Invalid redirect URI: {e}")))?;

    Ok(found(location))
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
