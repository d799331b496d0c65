use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tamv_auth::{Role, RoleSet};
use tamv_core::{DomainError, DomainResult, Record, RecordId, RecordKind, UserId};

use crate::validate;

const FULL_NAME_MAX: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Active,
    Disabled,
}

/// A user's profile within one tenant.
///
/// The profile id is the user's identity (`sub` in their credentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: RecordId,
    pub email: String,
    pub full_name: String,
    pub roles: RoleSet,
    pub status: ProfileStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUserProfile {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    /// Absent means `["user"]`.
    #[serde(default)]
    pub roles: Option<RoleSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfilePatch {
    pub full_name: Option<String>,
    pub roles: Option<RoleSet>,
    pub status: Option<ProfileStatus>,
}

impl NewUserProfile {
    pub fn requested_roles(&self) -> RoleSet {
        self.roles.unwrap_or(RoleSet::from(Role::User))
    }
}

impl UserProfile {
    /// `user` becomes the profile id and is the `sub` of every credential
    /// minted for this user.
    pub fn create(user: UserId, input: NewUserProfile, created_by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        let roles = input.requested_roles();
        if roles.is_empty() {
            return Err(DomainError::validation("roles must not be empty"));
        }

        Ok(Self {
            id: user.into(),
            email: validate::email(&input.email)?,
            full_name: validate::bounded_text(
                "full_name",
                input.full_name.as_deref().unwrap_or_default(),
                FULL_NAME_MAX,
            )?,
            roles,
            status: ProfileStatus::Active,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.id.into()
    }

    pub fn is_active(&self) -> bool {
        self.status == ProfileStatus::Active
    }

    /// Validate the whole patch first, then apply it.
    pub fn apply(&mut self, patch: UserProfilePatch, now: DateTime<Utc>) -> DomainResult<()> {
        if patch.full_name.is_none() && patch.roles.is_none() && patch.status.is_none() {
            return Err(DomainError::EmptyPatch);
        }
        if patch.roles.is_some_and(|r| r.is_empty()) {
            return Err(DomainError::validation("roles must not be empty"));
        }
        let full_name = patch
            .full_name
            .map(|n| validate::bounded_text("full_name", &n, FULL_NAME_MAX))
            .transpose()?;

        if let Some(full_name) = full_name {
            self.full_name = full_name;
        }
        if let Some(roles) = patch.roles {
            self.roles = roles;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Record for UserProfile {
    const KIND: RecordKind = RecordKind::User;

    fn record_id(&self) -> RecordId {
        self.id
    }
}
