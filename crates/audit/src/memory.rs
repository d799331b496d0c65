//! In-memory audit sink for tests/dev.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use tamv_core::TenantId;

use crate::{AuditEvent, AuditSink, AuditSinkError, TenantScoped};

/// Keeps the most recent events of every tenant in memory, queryable per
/// tenant. Each tenant holds at most `retained_per_tenant` events; older ones
/// are evicted first.
#[derive(Debug)]
pub struct InMemoryAuditSink {
    events: Mutex<HashMap<TenantId, VecDeque<AuditEvent>>>,
    retained_per_tenant: usize,
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::with_retention(Self::DEFAULT_RETAINED_PER_TENANT)
    }
}

impl InMemoryAuditSink {
    pub const DEFAULT_RETAINED_PER_TENANT: usize = 1_000;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retained_per_tenant: usize) -> Self {
        Self {
            events: Mutex::new(HashMap::new()),
            retained_per_tenant: retained_per_tenant.max(1),
        }
    }

    pub fn retained_per_tenant(&self) -> usize {
        self.retained_per_tenant
    }

    /// Events retained for one tenant, oldest first.
    pub fn for_tenant(&self, tenant_id: TenantId) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events
                .get(&tenant_id)
                .map(|log| log.iter().cloned().collect())
                .unwrap_or_default(),
            Err(_) => vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .map(|e| e.values().map(VecDeque::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditSinkError> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| AuditSinkError::Unavailable("in-memory audit log poisoned".to_string()))?;
        let log = events.entry(TenantScoped::tenant_id(event)).or_default();
        if log.len() >= self.retained_per_tenant {
            log.pop_front();
        }
        log.push_back(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tamv_core::UserId;

    #[tokio::test]
    async fn reads_are_filtered_by_tenant() {
        let sink = InMemoryAuditSink::new();
        let a = TenantId::new();
        let b = TenantId::new();
        for (tenant, ty) in [(a, "task.created"), (b, "post.created"), (a, "task.deleted")] {
            let event = AuditEvent::new(tenant, UserId::new(), ty, Utc::now(), serde_json::json!({}));
            sink.record(&event).await.unwrap();
        }

        let seen: Vec<_> = sink.for_tenant(a).iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(seen, vec!["task.created", "task.deleted"]);
        assert_eq!(sink.for_tenant(b).len(), 1);
        assert!(sink.for_tenant(TenantId::new()).is_empty());
        assert_eq!(sink.len(), 3);
    }

    #[tokio::test]
    async fn each_tenant_keeps_only_its_most_recent_events() {
        let sink = InMemoryAuditSink::with_retention(2);
        let busy = TenantId::new();
        let quiet = TenantId::new();

        let quiet_event = AuditEvent::new(quiet, UserId::new(), "post.created", Utc::now(), serde_json::json!({}));
        sink.record(&quiet_event).await.unwrap();
        for n in 0..5 {
            let event = AuditEvent::new(busy, UserId::new(), format!("task.{n}"), Utc::now(), serde_json::json!({}));
            sink.record(&event).await.unwrap();
        }

        let kept: Vec<_> = sink.for_tenant(busy).iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(kept, vec!["task.3", "task.4"]);
        // A noisy tenant does not evict anyone else's history.
        assert_eq!(sink.for_tenant(quiet), vec![quiet_event]);
        assert_eq!(sink.len(), 3);
    }
}
