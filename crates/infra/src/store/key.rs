use tamv_core::{RecordId, RecordKind, TenantId};

/// Composite storage key. The tenant is part of every key, so a record id on
/// its own never addresses anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey {
    tenant_id: TenantId,
    kind: RecordKind,
    record_id: RecordId,
}

impl StorageKey {
    pub fn new(tenant_id: TenantId, kind: RecordKind, record_id: RecordId) -> Self {
        Self {
            tenant_id,
            kind,
            record_id,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    /// `(tenant, kind)` partition this key lives in.
    pub fn partition(&self) -> (TenantId, RecordKind) {
        (self.tenant_id, self.kind)
    }
}

impl core::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}#{}", self.tenant_id, self.kind, self.record_id)
    }
}
