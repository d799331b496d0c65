//! Fire-and-forget audit emission.
//!
//! ```text
//! handler ──emit()──▶ bounded queue ──▶ worker task ──record()──▶ AuditSink
//! ```
//!
//! `emit` never awaits and never returns an error. When the queue is full or
//! the worker is gone the event is dropped and counted. The worker gives each
//! `record` call a fixed time budget; failures are logged and not retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::{AuditEvent, AuditSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitterConfig {
    /// Events buffered between handlers and the sink.
    pub capacity: usize,
    /// Upper bound for a single `AuditSink::record` call.
    pub sink_timeout: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            sink_timeout: Duration::from_secs(2),
        }
    }
}

/// Cloneable handle used by request handlers to record audit events.
#[derive(Debug, Clone)]
pub struct AuditEmitter {
    tx: Option<mpsc::Sender<AuditEvent>>,
    dropped: Arc<AtomicU64>,
}

impl AuditEmitter {
    /// Start the delivery worker on the current tokio runtime.
    ///
    /// The worker stops once every clone of the returned emitter is dropped.
    pub fn spawn(sink: Arc<dyn AuditSink>, config: EmitterConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let handle = tokio::spawn(run_worker(rx, sink, config.sink_timeout));
        (
            Self {
                tx: Some(tx),
                dropped: Arc::new(AtomicU64::new(0)),
            },
            handle,
        )
    }

    /// An emitter that discards everything (auditing turned off).
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueue an event. Never blocks, never fails the caller.
    pub fn emit(&self, event: AuditEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    tenant_id = %event.tenant_id(),
                    event_type = event.event_type(),
                    "audit queue full; event dropped"
                );
            }
            Err(TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    tenant_id = %event.tenant_id(),
                    event_type = event.event_type(),
                    "audit worker stopped; event dropped"
                );
            }
        }
    }

    /// Number of events dropped before reaching the worker.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }
}

async fn run_worker(mut rx: mpsc::Receiver<AuditEvent>, sink: Arc<dyn AuditSink>, sink_timeout: Duration) {
    while let Some(event) = rx.recv().await {
        match tokio::time::timeout(sink_timeout, sink.record(&event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                event_id = %event.event_id(),
                tenant_id = %event.tenant_id(),
                event_type = event.event_type(),
                error = %e,
                "audit event not recorded"
            ),
            Err(_) => tracing::warn!(
                event_id = %event.event_id(),
                tenant_id = %event.tenant_id(),
                event_type = event.event_type(),
                timeout_ms = sink_timeout.as_millis() as u64,
                "audit sink timed out"
            ),
        }
    }
    tracing::debug!("audit worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuditSinkError, InMemoryAuditSink};
    use async_trait::async_trait;
    use chrono::Utc;
    use tamv_core::{TenantId, UserId};

    fn event(tenant_id: TenantId, event_type: &str) -> AuditEvent {
        AuditEvent::new(tenant_id, UserId::new(), event_type, Utc::now(), serde_json::json!({}))
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within timeout");
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn record(&self, _event: &AuditEvent) -> Result<(), AuditSinkError> {
            Err(AuditSinkError::Unavailable("down".to_string()))
        }
    }

    /// Never completes until the test releases it.
    struct StuckSink(tokio::sync::Notify);

    #[async_trait]
    impl AuditSink for StuckSink {
        async fn record(&self, _event: &AuditEvent) -> Result<(), AuditSinkError> {
            self.0.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn emitted_events_reach_the_sink() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let (emitter, _worker) = AuditEmitter::spawn(sink.clone(), EmitterConfig::default());

        let a = TenantId::new();
        let b = TenantId::new();
        emitter.emit(event(a, "task.created"));
        emitter.emit(event(b, "task.created"));
        emitter.emit(event(a, "task.deleted"));

        eventually(|| sink.len() == 3).await;
        let types: Vec<String> = sink.for_tenant(a).iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(types, vec!["task.created", "task.deleted"]);
        assert_eq!(emitter.dropped(), 0);
    }

    #[tokio::test]
    async fn sink_failures_do_not_stop_the_worker() {
        let (emitter, worker) = AuditEmitter::spawn(Arc::new(FailingSink), EmitterConfig::default());
        for _ in 0..5 {
            emitter.emit(event(TenantId::new(), "post.created"));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!worker.is_finished());
        assert_eq!(emitter.dropped(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let sink = Arc::new(StuckSink(tokio::sync::Notify::new()));
        let config = EmitterConfig {
            capacity: 1,
            sink_timeout: Duration::from_secs(60),
        };
        let (emitter, _worker) = AuditEmitter::spawn(sink.clone(), config);

        for _ in 0..10 {
            emitter.emit(event(TenantId::new(), "task.created"));
        }
        // At most one in flight in the worker and one buffered.
        assert!(emitter.dropped() >= 8, "dropped {}", emitter.dropped());
        sink.0.notify_waiters();
    }

    #[tokio::test]
    async fn stopped_worker_counts_drops() {
        let (emitter, worker) = AuditEmitter::spawn(Arc::new(InMemoryAuditSink::new()), EmitterConfig::default());
        worker.abort();
        let _ = worker.await;

        emitter.emit(event(TenantId::new(), "task.created"));
        assert_eq!(emitter.dropped(), 1);
    }

    #[tokio::test]
    async fn slow_sink_is_cut_off_by_timeout() {
        let sink = Arc::new(StuckSink(tokio::sync::Notify::new()));
        let config = EmitterConfig {
            capacity: 8,
            sink_timeout: Duration::from_millis(20),
        };
        let (emitter, worker) = AuditEmitter::spawn(sink, config);
        emitter.emit(event(TenantId::new(), "a"));
        emitter.emit(event(TenantId::new(), "b"));

        // Both time out; the worker keeps draining.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!worker.is_finished());
    }

    #[test]
    fn disabled_emitter_accepts_everything() {
        let emitter = AuditEmitter::disabled();
        emitter.emit(event(TenantId::new(), "task.created"));
        assert!(!emitter.is_enabled());
        assert_eq!(emitter.dropped(), 0);
    }
}
