//! Credential minting (refresh and service-issued tokens).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use thiserror::Error;
use uuid::Uuid;

use tamv_core::{TenantId, UserId};

use crate::{CredentialClaims, Principal, RoleSet};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("failed to sign credential: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// A freshly minted credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub token: String,
    pub credential_id: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 credential issuer. Pairs with [`crate::Hs256CredentialVerifier`]
/// constructed from the same secret.
pub struct CredentialIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl CredentialIssuer {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_ref()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        subject: UserId,
        tenant_id: TenantId,
        roles: RoleSet,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, IssueError> {
        let expires_at = now + self.ttl;
        let credential_id = Uuid::now_v7().to_string();

        let claims = CredentialClaims {
            sub: subject.to_string(),
            tenant_id: Some(tenant_id.to_string()),
            roles: Some(roles.iter().map(|r| r.as_str().to_string()).collect()),
            iat: Some(now.timestamp()),
            exp: expires_at.timestamp(),
            jti: Some(credential_id.clone()),
            email: email.map(str::to_string),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)?;
        Ok(IssuedCredential {
            token,
            credential_id,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(expires_at),
        })
    }

    /// Re-mint a credential for an already verified principal.
    ///
    /// Subject and tenant are carried over. Roles and email are the caller's
    /// current ones, never the old credential's.
    pub fn refresh(
        &self,
        principal: &Principal,
        roles: RoleSet,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, IssueError> {
        self.issue(principal.subject(), principal.tenant_id(), roles, email, now)
    }
}

impl core::fmt::Debug for CredentialIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialIssuer").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CredentialVerifier, Hs256CredentialVerifier, Role};

    #[test]
    fn issued_credentials_verify_with_the_same_secret() {
        let issuer = CredentialIssuer::new("s3cret", Duration::minutes(15));
        let verifier = Hs256CredentialVerifier::new("s3cret");
        let now = Utc::now();
        let tenant = TenantId::new();
        let subject = UserId::new();

        let issued = issuer
            .issue(subject, tenant, RoleSet::of(&[Role::User, Role::Admin]), Some("a@b.co"), now)
            .unwrap();
        let principal = verifier.verify(&issued.token, now).unwrap();

        assert_eq!(principal.subject(), subject);
        assert_eq!(principal.tenant_id(), tenant);
        assert_eq!(principal.roles(), RoleSet::of(&[Role::User, Role::Admin]));
        assert_eq!(principal.credential_id(), Some(issued.credential_id.as_str()));
        assert_eq!(principal.email(), Some("a@b.co"));
        assert_eq!(principal.expires_at(), issued.expires_at);
    }

    #[test]
    fn issued_credentials_expire_after_ttl() {
        let issuer = CredentialIssuer::new("s3cret", Duration::minutes(15));
        let verifier = Hs256CredentialVerifier::new("s3cret");
        let now = Utc::now();

        let issued = issuer
            .issue(UserId::new(), TenantId::new(), RoleSet::from(Role::User), None, now)
            .unwrap();
        let later = now + Duration::minutes(16);
        assert_eq!(verifier.verify(&issued.token, later).unwrap_err().code(), "ExpiredCredential");
    }

    #[test]
    fn refresh_keeps_identity_and_takes_current_roles() {
        let issuer = CredentialIssuer::new("s3cret", Duration::minutes(15));
        let verifier = Hs256CredentialVerifier::new("s3cret");
        let now = Utc::now();

        let first = issuer
            .issue(UserId::new(), TenantId::new(), RoleSet::from(Role::Owner), None, now)
            .unwrap();
        let principal = verifier.verify(&first.token, now).unwrap();

        let second = issuer
            .refresh(&principal, RoleSet::from(Role::User), Some("now@b.co"), now + Duration::minutes(5))
            .unwrap();
        let refreshed = verifier.verify(&second.token, now + Duration::minutes(5)).unwrap();

        assert_ne!(first.credential_id, second.credential_id);
        assert!(second.expires_at > first.expires_at);
        assert_eq!(refreshed.subject(), principal.subject());
        assert_eq!(refreshed.tenant_id(), principal.tenant_id());
        assert_eq!(refreshed.roles(), RoleSet::from(Role::User));
        assert_eq!(refreshed.email(), Some("now@b.co"));
    }
}
