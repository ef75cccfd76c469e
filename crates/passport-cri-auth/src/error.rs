//! Error types for the credential issuer.
//!
//! `AuthError` covers everything outside the authorization request pipeline:
//! bearer token resolution, credential assembly and signing, and collaborator
//! failures. The authorization request pipeline reports through
//! [`crate::jar::ValidationOutcome`] instead, because some of its failures
//! are delivered by redirect rather than as a response body.

use std::fmt;

/// Errors that can occur while resolving tokens and issuing credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is malformed or is missing a required parameter.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// No access token was supplied.
    #[error("Missing access token")]
    MissingToken,

    /// The access token is well formed but grants no access.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description of why access was denied.
        message: String,
    },

    /// A field required for the credential is absent from the stored record.
    #[error("Credential assembly failed: missing {field}")]
    CredentialAssembly {
        /// Name of the missing field.
        field: String,
    },

    /// Signing the credential failed.
    #[error("Signing error: {message}")]
    Signing {
        /// Description of the signing error.
        message: String,
    },

    /// The key management service could not complete an operation.
    #[error("Key management error: {message}")]
    KeyManagement {
        /// Description of the key management error.
        message: String,
    },

    /// An error occurred while storing or retrieving data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates a new `CredentialAssembly` error.
    #[must_use]
    pub fn credential_assembly(field: impl Into<String>) -> Self {
        Self::CredentialAssembly {
            field: field.into(),
        }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `KeyManagement` error.
    #[must_use]
    pub fn key_management(message: impl Into<String>) -> Self {
        Self::KeyManagement {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. } | Self::MissingToken | Self::AccessDenied { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::MissingToken => ErrorCategory::Token,
            Self::AccessDenied { .. } => ErrorCategory::Token,
            Self::CredentialAssembly { .. } => ErrorCategory::Credential,
            Self::Signing { .. } => ErrorCategory::Credential,
            Self::KeyManagement { .. } => ErrorCategory::Infrastructure,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::MissingToken => "unauthorized",
            Self::AccessDenied { .. } => "access_denied",
            Self::CredentialAssembly { .. }
            | Self::Signing { .. }
            | Self::KeyManagement { .. }
            | Self::Storage { .. }
            | Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the human readable description sent as `error_description`.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::InvalidRequest { message } | Self::AccessDenied { message } => message.clone(),
            Self::MissingToken => "Missing access token".to_string(),
            other => other.to_string(),
        }
    }
}

/// Categories of errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bearer token problems.
    Token,
    /// Request validation errors.
    Validation,
    /// Credential assembly or signing errors.
    Credential,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Credential => write!(f, "credential"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
