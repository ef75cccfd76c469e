//! Audit events.
//!
//! The issuer reports two milestones: a validated authorization request and
//! an issued credential. Events go to an [`AuditSink`]; delivery failures are
//! logged and never fail the request that raised them.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;

/// Audit event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    /// An authorization request passed validation.
    IpvPassportCriAuthorizationRequested,
    /// A credential was signed and returned.
    IpvPassportCriVcIssued,
}

impl AuditEventType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IpvPassportCriAuthorizationRequested => {
                "IPV_PASSPORT_CRI_AUTHORIZATION_REQUESTED"
            }
            Self::IpvPassportCriVcIssued => "IPV_PASSPORT_CRI_VC_ISSUED",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audit event as delivered to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unix seconds.
    pub timestamp: i64,

    pub event_name: AuditEventType,
}

impl AuditEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn now(event_name: AuditEventType) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc().unix_timestamp(),
            event_name,
        }
    }
}

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Delivers one event.
    async fn send(&self, event: &AuditEvent) -> AuthResult<()>;
}

/// Writes audit events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn send(&self, event: &AuditEvent) -> AuthResult<()> {
        tracing::info!(
            target: "audit",
            event_name = %event.event_name,
            timestamp = event.timestamp,
            "Audit event"
        );
        Ok(())
    }
}

/// Sends `event_name` to `sink`, logging instead of failing on error.
pub async fn emit(sink: &dyn AuditSink, event_name: AuditEventType) {
    let event = AuditEvent::now(event_name);
    if let Err(e) = sink.send(&event).await {
        tracing::error!(event_name = %event_name, error = %e, "Failed to send audit event");
    }
}
