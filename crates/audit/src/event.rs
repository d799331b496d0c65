use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tamv_core::{TenantId, UserId};

/// One usage/audit record.
///
/// Notes:
/// - **Multi-tenancy** is enforced here via `tenant_id`, always taken from the
///   authorized request context.
/// - `event_type` is a stable dotted name (e.g. `"task.created"`).
/// - `metadata` is free-form JSON; never put secrets or credentials in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    event_id: Uuid,
    tenant_id: TenantId,
    actor_id: UserId,
    event_type: String,
    timestamp: DateTime<Utc>,
    metadata: serde_json::Value,
}

impl AuditEvent {
    pub fn new(
        tenant_id: TenantId,
        actor_id: UserId,
        event_type: impl Into<String>,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            tenant_id,
            actor_id,
            event_type: event_type.into(),
            timestamp,
            metadata,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn actor_id(&self) -> UserId {
        self.actor_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }
}
