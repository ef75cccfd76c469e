//! Error responses.
//!
//! Failures are answered with a JSON body `{"error", "error_description"}`.
//! 401 responses also carry a `WWW-Authenticate: Bearer` challenge.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::jar::{FatalFailure, JarErrorCode};

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_description: String,
}

impl AuthError {
    /// Returns the HTTP status this error is answered with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::AccessDenied { .. } => StatusCode::FORBIDDEN,
            Self::CredentialAssembly { .. }
            | Self::Signing { .. }
            | Self::KeyManagement { .. }
            | Self::Storage { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl JarErrorCode {
    /// Returns the HTTP status a fatal failure with this code is answered with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestObject | Self::InvalidGrant => StatusCode::BAD_REQUEST,
            Self::InvalidClient => StatusCode::UNAUTHORIZED,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.oauth_error_code();

        if status.is_server_error() {
            tracing::error!(category = %self.category(), error = %self, "Request failed");
        } else {
            tracing::info!(category = %self.category(), error = %self, "Request rejected");
        }

        // Server-side details stay in the log.
        let description = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.description()
        };

        error_response(status, error, description)
    }
}

impl IntoResponse for FatalFailure {
    fn into_response(self) -> Response {
        let code = self.error_code();
        error_response(code.status_code(), code.as_str(), self.description)
    }
}

fn error_response(status: StatusCode, error: &str, description: String) -> Response {
    let mut headers = HeaderMap::new();
    if status == StatusCode::UNAUTHORIZED {
        let www_auth = build_www_authenticate_header(error, &description);
        if let Ok(value) = HeaderValue::from_str(&www_auth) {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }
    }

    let body = ErrorBody {
        error: error.to_string(),
        error_description: description,
    };

    (status, headers, Json(body)).into_response()
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer error="unauthorized", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('"', "\\\"");
    format!("Bearer error=\"{error}\", error_description=\"{escaped_desc}\"")
}
