//! Redis Streams audit sink.
//!
//! Each event is appended with `XADD` to a single capped stream
//! (`tamv:audit` by default). `tenant_id` and `event_type` are stored as
//! stream fields next to the JSON payload so consumers can filter per tenant
//! without decoding every entry.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use tamv_audit::{AuditEvent, AuditSink, AuditSinkError};

/// Default stream key for audit events
const DEFAULT_STREAM_KEY: &str = "tamv:audit";
/// Approximate cap on stream length (`XADD MAXLEN ~`)
const DEFAULT_MAX_LEN: usize = 100_000;

#[derive(Debug, Clone)]
pub struct RedisStreamsAuditSink {
    client: Arc<redis::Client>,
    stream_key: String,
    max_len: usize,
}

impl RedisStreamsAuditSink {
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `stream_key` - Redis stream key (default: "tamv:audit")
    pub fn new(redis_url: impl AsRef<str>, stream_key: Option<String>) -> Result<Self, AuditSinkError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| AuditSinkError::Unavailable(format!("invalid redis url: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
            stream_key: stream_key.unwrap_or_else(|| DEFAULT_STREAM_KEY.to_string()),
            max_len: DEFAULT_MAX_LEN,
        })
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    fn append_sync(&self, event: &AuditEvent) -> Result<(), AuditSinkError> {
        let payload = serde_json::to_string(event).map_err(|e| AuditSinkError::Rejected(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| AuditSinkError::Unavailable(e.to_string()))?;

        let _: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_len)
            .arg("*")
            .arg("tenant_id")
            .arg(event.tenant_id().to_string())
            .arg("event_type")
            .arg(event.event_type())
            .arg("payload")
            .arg(&payload)
            .query(&mut conn)
            .map_err(|e| AuditSinkError::Unavailable(format!("XADD failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for RedisStreamsAuditSink {
    #[instrument(
        skip(self, event),
        fields(stream_key = %self.stream_key, tenant_id = %event.tenant_id(), event_type = event.event_type()),
        err
    )]
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditSinkError> {
        // The redis client here is blocking; keep it off the async workers.
        let sink = self.clone();
        let event = event.clone();
        tokio::task::spawn_blocking(move || sink.append_sync(&event))
            .await
            .map_err(|e| AuditSinkError::Unavailable(format!("redis task failed: {e}")))?
    }
}
