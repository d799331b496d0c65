//! Service wiring: verifier, issuer, store, audit pipeline and rate limiters,
//! built once at startup and shared with handlers as `Extension<Arc<AppServices>>`.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use tamv_audit::{AuditEmitter, AuditEvent, AuditSink, AuditSinkError, EmitterConfig, InMemoryAuditSink, TracingAuditSink};
use tamv_auth::{AuthorizedContext, CredentialIssuer, CredentialVerifier, Hs256CredentialVerifier, RevocationList};
use tamv_core::{Record, TenantId, UserId};
use tamv_infra::store::{
    IdentityLookup, InMemoryTenantStore, PostgresTenantStore, StoreError, TenantAccessor, TenantStore,
};

use crate::config::{ApiConfig, AuditSinkKind};
use crate::rate_limit::Limiter;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("tenant store: {0}")]
    Store(#[from] StoreError),

    #[error("audit sink: {0}")]
    Audit(#[from] AuditSinkError),
}

pub struct AppServices {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub issuer: CredentialIssuer,
    pub revocations: Arc<RevocationList>,
    pub store: Arc<dyn TenantStore>,
    pub audit: AuditEmitter,
    /// Queryable audit log; present only with the in-memory sink.
    pub audit_log: Option<Arc<InMemoryAuditSink>>,
    /// Per client address, shared by register, login and refresh.
    pub auth_limiter: Arc<Limiter>,
    /// Per tenant and author.
    pub post_limiter: Limiter,
}

impl AppServices {
    /// Wire services around an explicit store and audit sink.
    ///
    /// Spawns the audit worker, so this must run inside a tokio runtime.
    pub fn with_parts(
        config: &ApiConfig,
        store: Arc<dyn TenantStore>,
        audit_sink: Arc<dyn AuditSink>,
        audit_log: Option<Arc<InMemoryAuditSink>>,
    ) -> Self {
        let revocations = Arc::new(RevocationList::with_leeway(config.clock_leeway));
        let verifier = Hs256CredentialVerifier::new(&config.jwt_secret)
            .with_leeway(config.clock_leeway)
            .with_revocations(revocations.clone());

        let (audit, _worker) = AuditEmitter::spawn(
            audit_sink,
            EmitterConfig {
                capacity: config.audit_queue_capacity,
                ..EmitterConfig::default()
            },
        );

        Self {
            verifier: Arc::new(verifier),
            issuer: CredentialIssuer::new(&config.jwt_secret, config.token_ttl),
            revocations,
            store,
            audit,
            audit_log,
            auth_limiter: Arc::new(Limiter::new("auth", config.auth_rate_limit)),
            post_limiter: Limiter::new("post_create", config.post_rate_limit),
        }
    }

    /// In-memory store and queryable in-memory audit log.
    pub fn in_memory(config: &ApiConfig) -> Self {
        let log = Arc::new(InMemoryAuditSink::new());
        let sink: Arc<dyn AuditSink> = log.clone();
        Self::with_parts(config, Arc::new(InMemoryTenantStore::new()), sink, Some(log))
    }

    /// Typed record access bound to the caller's tenant.
    pub fn accessor<R: Record>(&self, ctx: &AuthorizedContext) -> TenantAccessor<'_, R> {
        TenantAccessor::new(ctx, self.store.as_ref())
    }

    /// Unauthenticated reads for login and refresh. Never hand this to a
    /// request handler that serves tenant data.
    pub fn identities(&self, tenant_id: TenantId) -> IdentityLookup<'_> {
        IdentityLookup::new(tenant_id, self.store.as_ref())
    }

    /// Fire-and-forget; never affects the response.
    pub fn record_audit(&self, tenant_id: TenantId, actor: UserId, event_type: &str, metadata: serde_json::Value) {
        self.audit
            .emit(AuditEvent::new(tenant_id, actor, event_type, Utc::now(), metadata));
    }

    pub fn audit_as(&self, ctx: &AuthorizedContext, event_type: &str, metadata: serde_json::Value) {
        self.record_audit(ctx.tenant_id(), ctx.actor(), event_type, metadata);
    }
}

pub async fn build_services(config: &ApiConfig) -> Result<AppServices, ServiceError> {
    let store: Arc<dyn TenantStore> = match &config.database_url {
        Some(url) => {
            let pg = PostgresTenantStore::connect(url).await?;
            pg.migrate().await?;
            tracing::info!("using postgres tenant store");
            Arc::new(pg)
        }
        None => {
            tracing::info!("using in-memory tenant store");
            Arc::new(InMemoryTenantStore::new())
        }
    };

    let (sink, audit_log): (Arc<dyn AuditSink>, Option<Arc<InMemoryAuditSink>>) = match config.audit_sink {
        AuditSinkKind::Memory => {
            let log = Arc::new(InMemoryAuditSink::new());
            let sink: Arc<dyn AuditSink> = log.clone();
            (sink, Some(log))
        }
        AuditSinkKind::Log => {
            let sink: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
            (sink, None)
        }
        AuditSinkKind::Redis => (redis_sink(config)?, None),
    };
    tracing::info!(audit_sink = ?config.audit_sink, "audit pipeline ready");

    Ok(AppServices::with_parts(config, store, sink, audit_log))
}

#[cfg(feature = "redis")]
fn redis_sink(config: &ApiConfig) -> Result<Arc<dyn AuditSink>, ServiceError> {
    let sink = tamv_infra::audit_sink::RedisStreamsAuditSink::new(&config.redis_url, None)?;
    Ok(Arc::new(sink))
}

#[cfg(not(feature = "redis"))]
fn redis_sink(_config: &ApiConfig) -> Result<Arc<dyn AuditSink>, ServiceError> {
    Err(ServiceError::Audit(AuditSinkError::Unavailable(
        "built without the redis feature".to_string(),
    )))
}
