//! Authorization responses delivered by redirect.
//!
//! Both the success response and the error response are appended to the
//! client's registered redirect URI as query parameters. Any fragment on the
//! redirect URI is dropped.
//!
//! # Example
//!
//! ```ignore
//! HTTP/1.1 302 Found
//! Location: https://client.example.com/callback?
//!   error=invalid_grant
//!   &error_description=Expired+JWT
//!   &state=af0ifjsldkj
//! ```

use crate::jar::JarErrorCode;

/// Successful authorization response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    /// The authorization code.
    pub code: String,

    /// Echoed state from the request object.
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Creates a new authorization response.
    #[must_use]
    pub fn new(code: impl Into<String>, state: Option<String>) -> Self {
        Self {
            code: code.into(),
            state,
        }
    }

    /// Builds the redirect URL with the code and state.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        url.set_fragment(None);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// Authorization error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationError {
    /// OAuth error code.
    pub error: JarErrorCode,

    /// Human readable error description.
    pub error_description: Option<String>,

    /// Echoed state from the request object.
    pub state: Option<String>,
}

impl AuthorizationError {
    /// Builds the redirect URL with the error parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        url.set_fragment(None);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", self.error.as_str());
            if let Some(ref desc) = self.error_description {
                pairs.append_pair("error_description", desc);
            }
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}
