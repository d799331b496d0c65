//! Audit sink abstraction (where events end up).
//!
//! A sink is the outbound edge of the audit pipeline: a message queue, an
//! event bus, a log stream. Delivery is best-effort; the emitter logs sink
//! failures and moves on, so implementations should not retry internally for
//! long.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::AuditEvent;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditSinkError {
    /// The backing transport could not be reached.
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    /// The transport refused the event (serialization, size, auth...).
    #[error("audit sink rejected event: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditSinkError>;
}

#[async_trait]
impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditSinkError> {
        (**self).record(event).await
    }
}

/// Writes each event as one structured `tracing` line (target `audit`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditSinkError> {
        tracing::info!(
            target: "audit",
            event_id = %event.event_id(),
            tenant_id = %event.tenant_id(),
            actor_id = %event.actor_id(),
            event_type = event.event_type(),
            timestamp = %event.timestamp().to_rfc3339(),
            metadata = %event.metadata(),
            "audit event"
        );
        Ok(())
    }
}
