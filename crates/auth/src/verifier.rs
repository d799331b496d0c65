//! Bearer credential verification.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use tamv_core::{TenantId, UserId};

use crate::{CredentialClaims, Principal, RevocationList, Role, RoleSet, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Malformed, unsigned, wrongly signed, revoked or otherwise unusable.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("credential has expired")]
    ExpiredCredential,

    #[error("credential carries no tenant claim")]
    MissingTenantClaim,
}

impl CredentialError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidCredential(reason.into())
    }

    /// Stable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            CredentialError::InvalidCredential(_) => "InvalidCredential",
            CredentialError::ExpiredCredential => "ExpiredCredential",
            CredentialError::MissingTenantClaim => "MissingTenantClaim",
        }
    }
}

/// Turns a bearer credential into a [`Principal`].
///
/// Implementations must be pure over `(token, now)` and their own keys.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, CredentialError>;
}

impl<V> CredentialVerifier for Arc<V>
where
    V: CredentialVerifier + ?Sized,
{
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, CredentialError> {
        (**self).verify(token, now)
    }
}

/// HS256 (shared secret) JWT verifier.
pub struct Hs256CredentialVerifier {
    key: DecodingKey,
    validation: Validation,
    leeway: Duration,
    revocations: Option<Arc<RevocationList>>,
}

impl Hs256CredentialVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks run in `validate_claims` against an injected clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
            leeway: Duration::zero(),
            revocations: None,
        }
    }

    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn with_revocations(mut self, revocations: Arc<RevocationList>) -> Self {
        self.revocations = Some(revocations);
        self
    }

    fn decode(&self, token: &str) -> Result<CredentialClaims, CredentialError> {
        jsonwebtoken::decode::<CredentialClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "credential decode failed");
                CredentialError::invalid("malformed or unsigned credential")
            })
    }
}

impl core::fmt::Debug for Hs256CredentialVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256CredentialVerifier")
            .field("leeway", &self.leeway)
            .field("revocations", &self.revocations.is_some())
            .finish_non_exhaustive()
    }
}

impl CredentialVerifier for Hs256CredentialVerifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, CredentialError> {
        let claims = self.decode(token)?;
        validate_claims(&claims, now, self.leeway)?;

        let tenant_id = match claims.tenant_id.as_deref().map(str::trim) {
            None | Some("") => return Err(CredentialError::MissingTenantClaim),
            Some(raw) => raw
                .parse::<TenantId>()
                .map_err(|_| CredentialError::invalid("tenant claim is not a tenant id"))?,
        };

        let subject: UserId = claims
            .sub
            .parse()
            .map_err(|_| CredentialError::invalid("subject claim is not a user id"))?;

        if let (Some(jti), Some(revocations)) = (claims.jti.as_deref(), self.revocations.as_ref()) {
            if revocations.is_revoked(jti) {
                return Err(CredentialError::invalid("credential has been revoked"));
            }
        }

        let roles = roles_from_claims(claims.roles.as_deref());
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| CredentialError::invalid("exp claim out of range"))?;

        let mut principal = Principal::new(subject, tenant_id, roles, expires_at);
        if let Some(jti) = claims.jti {
            principal = principal.with_credential_id(jti);
        }
        if let Some(email) = claims.email {
            principal = principal.with_email(email);
        }
        Ok(principal)
    }
}

fn roles_from_claims(raw: Option<&[String]>) -> RoleSet {
    let Some(raw) = raw else {
        return RoleSet::from(Role::User);
    };

    raw.iter()
        .filter_map(|name| match name.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!(role = %name, "ignoring {e}");
                None
            }
        })
        .collect()
}
