//! Request-scoped log fields.
//!
//! Every request runs inside a span carrying the component id and, once
//! known, the client and session ids. Field names are fixed so log queries
//! can rely on them. The session id is the resource id of the identity
//! check, known only part way through a request, so it is recorded onto the
//! open span with [`attach_session_id`].

use tracing::Span;
use tracing::field::Empty;

/// Component id attached to every request span.
pub const COMPONENT_ID: &str = "passport-cri";

/// Log field holding the OAuth client id.
pub const CLIENT_ID_LOG_FIELD: &str = "client-id";

/// Log field holding the session (resource) id.
pub const SESSION_ID_LOG_FIELD: &str = "session-id";

/// Log field holding [`COMPONENT_ID`].
pub const COMPONENT_ID_LOG_FIELD: &str = "component-id";

/// Immutable set of log fields for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContext {
    client_id: Option<String>,
}

impl LogContext {
    /// Creates a context carrying only the component id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy carrying `client_id`.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// The fields this context attaches, in a stable order.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![(COMPONENT_ID_LOG_FIELD, COMPONENT_ID)];
        if let Some(client_id) = self.client_id() {
            fields.push((CLIENT_ID_LOG_FIELD, client_id));
        }
        fields
    }

    /// Creates an info-level span for `operation` carrying these fields.
    ///
    /// `session-id` starts empty; see [`attach_session_id`].
    #[must_use]
    pub fn span(&self, operation: &'static str) -> Span {
        let span = tracing::info_span!(
            "passport_cri",
            operation = operation,
            "component-id" = COMPONENT_ID,
            "client-id" = Empty,
            "session-id" = Empty,
        );
        if let Some(client_id) = self.client_id() {
            span.record(CLIENT_ID_LOG_FIELD, client_id);
        }
        span
    }
}

/// Records `session_id` on the current request span.
///
/// No effect unless the current span was created by [`LogContext::span`].
pub fn attach_session_id(session_id: &str) {
    Span::current().record(SESSION_ID_LOG_FIELD, session_id);
}
