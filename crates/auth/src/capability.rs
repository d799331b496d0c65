use serde::{Deserialize, Serialize};

use crate::{Role, RoleSet};

/// Capability required to perform an operation.
///
/// Capabilities are a closed set; each one is held by a fixed set of roles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    Write,
    Delete,
    ManageUsers,
    ViewAudit,
}

const MEMBERS: RoleSet = RoleSet::of(&[Role::User, Role::Admin, Role::Owner]);
const ADMINS: RoleSet = RoleSet::of(&[Role::Admin, Role::Owner]);

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Read,
        Capability::Write,
        Capability::Delete,
        Capability::ManageUsers,
        Capability::ViewAudit,
    ];

    /// Roles that hold this capability. A principal holds the capability when
    /// its role set intersects this one.
    pub fn required_roles(&self) -> RoleSet {
        match self {
            Capability::Read | Capability::Write => MEMBERS,
            Capability::Delete | Capability::ManageUsers | Capability::ViewAudit => ADMINS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Write => "write",
            Capability::Delete => "delete",
            Capability::ManageUsers => "manage_users",
            Capability::ViewAudit => "view_audit",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
