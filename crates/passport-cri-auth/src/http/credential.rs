//! Credential endpoint.
//!
//! `POST /credential/issue` with the request JWT as the body and the access
//! token as a bearer `Authorization` header. Answers with the signed
//! credential as `application/jwt`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use crate::credential::CredentialIssuer;
use crate::logging::LogContext;

/// Content type of issued credentials.
pub const APPLICATION_JWT: &str = "application/jwt";

/// State for the credential handler.
#[derive(Clone)]
pub struct CredentialState {
    pub issuer: Arc<CredentialIssuer>,
}

/// POST /credential/issue handler.
pub async fn issue_credential_handler(
    State(state): State<CredentialState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    // A header that is not visible ASCII is treated as a malformed bearer token.
    let authorization = headers
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    let span = LogContext::new().span("issue_credential");
    async move {
        match state.issuer.issue(&body, authorization).await {
            Ok(issued) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JWT))],
                issued.jwt,
            )
                .into_response(),
            Err(e) => e.into_response(),
        }
    }
    .instrument(span)
    .await
}
