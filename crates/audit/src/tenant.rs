use tamv_core::TenantId;

use crate::AuditEvent;

/// Helper trait for tenant-scoped messages.
///
/// Sinks and readers use it to filter by tenant without knowing the concrete
/// message type.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}

impl TenantScoped for AuditEvent {
    fn tenant_id(&self) -> TenantId {
        AuditEvent::tenant_id(self)
    }
}
