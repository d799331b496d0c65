//! Request-side authorization guard.
//!
//! Handlers call [`require`] first, before decoding the body or touching the
//! store. Denials are logged with the explanation and surface as `Forbidden`.

use tamv_auth::{AuthorizedContext, Capability, Principal, authorize, explain};

use crate::app::errors::ApiError;

pub fn require(principal: &Principal, capability: Capability) -> Result<AuthorizedContext, ApiError> {
    authorize(principal, capability).map_err(|e| {
        let explanation = explain(principal, capability);
        tracing::info!(
            tenant_id = %principal.tenant_id(),
            actor = %principal.subject(),
            capability = %capability,
            reason = %explanation.reason,
            "authorization denied"
        );
        ApiError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tamv_auth::{Role, RoleSet};
    use tamv_core::{TenantId, UserId};

    #[test]
    fn denial_is_forbidden_not_degraded() {
        let principal = Principal::new(
            UserId::new(),
            TenantId::new(),
            RoleSet::from(Role::User),
            Utc::now() + Duration::minutes(1),
        );
        assert!(require(&principal, Capability::Write).is_ok());
        assert_eq!(require(&principal, Capability::Delete).unwrap_err().code(), "Forbidden");
    }
}
