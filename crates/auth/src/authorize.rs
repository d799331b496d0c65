use serde::Serialize;
use thiserror::Error;

use tamv_core::{TenantId, UserId};

use crate::{Capability, Principal, Role, RoleSet};

/// Request-scoped context produced by a successful authorization decision.
///
/// Fields are private and [`authorize`] is the only constructor, so holding
/// one proves that the capability was checked and that `tenant_id` came from
/// a verified principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedContext {
    tenant_id: TenantId,
    actor: UserId,
    roles: RoleSet,
    capability: Capability,
}

impl AuthorizedContext {
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn actor(&self) -> UserId {
        self.actor
    }

    pub fn roles(&self) -> RoleSet {
        self.roles
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Whether the actor could grant `role` to someone else.
    ///
    /// Nobody may hand out a role above their own: only owners grant `owner`.
    pub fn may_grant(&self, role: Role) -> bool {
        match role {
            Role::Owner => self.roles.contains(Role::Owner),
            Role::Admin | Role::User => self.roles.intersects(Capability::ManageUsers.required_roles()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing capability '{0}'")]
    Forbidden(Capability),
}

/// Authorize a principal for one capability within its own tenant.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, capability: Capability) -> Result<AuthorizedContext, AuthzError> {
    if !principal.roles().intersects(capability.required_roles()) {
        return Err(AuthzError::Forbidden(capability));
    }

    Ok(AuthorizedContext {
        tenant_id: principal.tenant_id(),
        actor: principal.subject(),
        roles: principal.roles(),
        capability,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub capability: Capability,
    pub granted: bool,
    pub tenant_id: TenantId,
    pub subject: UserId,
    pub principal_roles: RoleSet,
    /// Roles that would have granted the capability.
    pub accepted_roles: RoleSet,
    pub reason: String,
}

/// Explain why an authorization decision was made (or would be made).
pub fn explain(principal: &Principal, capability: Capability) -> AuthorizationExplanation {
    let accepted = capability.required_roles();
    let matching = principal.roles().intersection(accepted);
    let granted = !matching.is_empty();

    let reason = if granted {
        format!("role(s) {:?} hold capability '{}'", matching, capability)
    } else if principal.roles().is_empty() {
        format!("principal has no roles; '{}' requires one of {:?}", capability, accepted)
    } else {
        format!(
            "roles {:?} do not hold '{}'; requires one of {:?}",
            principal.roles(),
            capability,
            accepted
        )
    };

    AuthorizationExplanation {
        capability,
        granted,
        tenant_id: principal.tenant_id(),
        subject: principal.subject(),
        principal_roles: principal.roles(),
        accepted_roles: accepted,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn principal(roles: &[Role]) -> Principal {
        Principal::new(
            UserId::new(),
            TenantId::new(),
            RoleSet::of(roles),
            Utc::now() + Duration::minutes(5),
        )
    }

    #[test]
    fn context_carries_tenant_from_principal() {
        let p = principal(&[Role::User]);
        let ctx = authorize(&p, Capability::Read).unwrap();
        assert_eq!(ctx.tenant_id(), p.tenant_id());
        assert_eq!(ctx.actor(), p.subject());
        assert_eq!(ctx.capability(), Capability::Read);
    }

    #[test]
    fn user_cannot_delete() {
        let p = principal(&[Role::User]);
        assert_eq!(
            authorize(&p, Capability::Delete),
            Err(AuthzError::Forbidden(Capability::Delete))
        );
    }

    #[test]
    fn empty_role_set_is_forbidden_everything() {
        let p = principal(&[]);
        for cap in Capability::ALL {
            assert!(authorize(&p, cap).is_err(), "granted {cap}");
        }
    }

    #[test]
    fn only_owners_grant_owner() {
        let admin = authorize(&principal(&[Role::Admin]), Capability::ManageUsers).unwrap();
        assert!(admin.may_grant(Role::User));
        assert!(admin.may_grant(Role::Admin));
        assert!(!admin.may_grant(Role::Owner));

        let owner = authorize(&principal(&[Role::Owner]), Capability::ManageUsers).unwrap();
        assert!(owner.may_grant(Role::Owner));
    }

    fn role_strategy() -> impl proptest::strategy::Strategy<Value = Vec<Role>> {
        proptest::collection::vec(proptest::sample::select(Role::ALL.to_vec()), 0..4)
    }

    fn capability_strategy() -> impl proptest::strategy::Strategy<Value = Capability> {
        proptest::sample::select(Capability::ALL.to_vec())
    }

    proptest::proptest! {
        #[test]
        fn granted_iff_some_role_holds_capability(roles in role_strategy(), cap in capability_strategy()) {
            let p = principal(&roles);
            let expected = roles.iter().any(|r| cap.required_roles().contains(*r));
            proptest::prop_assert_eq!(authorize(&p, cap).is_ok(), expected);
        }
    }

    #[test]
    fn explanation_matches_decision() {
        for roles in [&[][..], &[Role::User][..], &[Role::Admin][..], &[Role::User, Role::Owner][..]] {
            let p = principal(roles);
            for cap in Capability::ALL {
                let e = explain(&p, cap);
                assert_eq!(e.granted, authorize(&p, cap).is_ok());
                assert_eq!(e.accepted_roles, cap.required_roles());
            }
        }
    }
}
