use chrono::{DateTime, Utc};
use serde::Serialize;

use tamv_core::{TenantId, UserId};

use crate::RoleSet;

/// An authenticated identity plus its tenant and role claims.
///
/// Produced by a [`crate::CredentialVerifier`] and immutable for the lifetime
/// of one request. The tenant here is the only tenant a request may act in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    subject: UserId,
    tenant_id: TenantId,
    roles: RoleSet,
    expires_at: DateTime<Utc>,
    credential_id: Option<String>,
    email: Option<String>,
}

impl Principal {
    pub fn new(subject: UserId, tenant_id: TenantId, roles: RoleSet, expires_at: DateTime<Utc>) -> Self {
        Self {
            subject,
            tenant_id,
            roles,
            expires_at,
            credential_id: None,
            email: None,
        }
    }

    pub fn with_credential_id(mut self, credential_id: impl Into<String>) -> Self {
        self.credential_id = Some(credential_id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn subject(&self) -> UserId {
        self.subject
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn roles(&self) -> RoleSet {
        self.roles
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn credential_id(&self) -> Option<&str> {
        self.credential_id.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
