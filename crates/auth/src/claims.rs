use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::CredentialError;

/// Credential claims as they travel inside the signed token.
///
/// Claims are kept in their wire shape (strings, Unix seconds) so that a
/// token with a missing or malformed claim still decodes and can be rejected
/// with a precise error instead of a generic decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject / principal identifier.
    pub sub: String,

    /// Tenant context for the token.
    ///
    /// A token carrying more than one of the accepted names is ambiguous and
    /// fails to decode.
    #[serde(
        default,
        alias = "tenantId",
        alias = "custom:tenantId",
        skip_serializing_if = "Option::is_none"
    )]
    pub tenant_id: Option<String>,

    /// Roles granted within the tenant context. Absent means `["user"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    /// Issued-at (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration (Unix seconds).
    pub exp: i64,

    /// Credential id, used for revocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CredentialClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|iat| DateTime::from_timestamp(iat, 0))
    }
}

/// Deterministically validate the credential time window.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// the verifier before this is called.
pub fn validate_claims(
    claims: &CredentialClaims,
    now: DateTime<Utc>,
    leeway: Duration,
) -> Result<(), CredentialError> {
    let expires_at = claims
        .expires_at()
        .ok_or_else(|| CredentialError::invalid("exp claim out of range"))?;

    if let Some(iat) = claims.iat {
        let issued_at = claims
            .issued_at()
            .ok_or_else(|| CredentialError::invalid("iat claim out of range"))?;
        if claims.exp <= iat {
            return Err(CredentialError::invalid("invalid time window (exp <= iat)"));
        }
        let earliest = issued_at
            .checked_sub_signed(leeway)
            .ok_or_else(|| CredentialError::invalid("iat claim out of range"))?;
        if now < earliest {
            return Err(CredentialError::invalid("credential not yet valid"));
        }
    }

    let latest = expires_at
        .checked_add_signed(leeway)
        .ok_or_else(|| CredentialError::invalid("exp claim out of range"))?;
    if now >= latest {
        return Err(CredentialError::ExpiredCredential);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(iat: Option<i64>, exp: i64) -> CredentialClaims {
        CredentialClaims {
            sub: "00000000-0000-0000-0000-000000000001".to_string(),
            tenant_id: Some("00000000-0000-0000-0000-000000000002".to_string()),
            roles: None,
            iat,
            exp,
            jti: None,
            email: None,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn accepts_inside_window() {
        let c = claims(Some(1_000), 2_000);
        assert_eq!(validate_claims(&c, at(1_500), Duration::zero()), Ok(()));
        assert_eq!(validate_claims(&c, at(1_000), Duration::zero()), Ok(()));
    }

    #[test]
    fn expiry_is_exclusive() {
        let c = claims(Some(1_000), 2_000);
        assert_eq!(
            validate_claims(&c, at(2_000), Duration::zero()),
            Err(CredentialError::ExpiredCredential)
        );
        assert_eq!(
            validate_claims(&c, at(9_999), Duration::zero()),
            Err(CredentialError::ExpiredCredential)
        );
    }

    #[test]
    fn leeway_extends_both_ends() {
        let c = claims(Some(1_000), 2_000);
        let leeway = Duration::seconds(30);
        assert_eq!(validate_claims(&c, at(2_010), leeway), Ok(()));
        assert_eq!(validate_claims(&c, at(980), leeway), Ok(()));
        assert_eq!(validate_claims(&c, at(2_030), leeway), Err(CredentialError::ExpiredCredential));
    }

    #[test]
    fn future_and_inverted_windows_are_invalid_not_expired() {
        let future = claims(Some(5_000), 6_000);
        assert!(matches!(
            validate_claims(&future, at(1_000), Duration::zero()),
            Err(CredentialError::InvalidCredential(_))
        ));

        let inverted = claims(Some(2_000), 1_000);
        assert!(matches!(
            validate_claims(&inverted, at(1_500), Duration::zero()),
            Err(CredentialError::InvalidCredential(_))
        ));
    }

    #[test]
    fn expiry_at_the_end_of_time_with_leeway_is_invalid_not_a_panic() {
        let max = DateTime::<Utc>::MAX_UTC.timestamp();
        let c = claims(Some(1_000), max);
        assert!(matches!(
            validate_claims(&c, at(1_500), Duration::seconds(30)),
            Err(CredentialError::InvalidCredential(_))
        ));

        let min = DateTime::<Utc>::MIN_UTC.timestamp();
        let c = claims(Some(min), 2_000);
        assert!(matches!(
            validate_claims(&c, at(1_500), Duration::seconds(30)),
            Err(CredentialError::InvalidCredential(_))
        ));
    }

    #[test]
    fn tenant_claim_under_two_names_does_not_decode() {
        let both = serde_json::from_value::<CredentialClaims>(serde_json::json!({
            "sub": "s", "tenant_id": "a", "tenantId": "b", "exp": 1
        }));
        assert!(both.is_err());
    }

    #[test]
    fn tenant_claim_accepts_legacy_names() {
        let camel: CredentialClaims =
            serde_json::from_value(serde_json::json!({ "sub": "s", "tenantId": "t", "exp": 1 })).unwrap();
        assert_eq!(camel.tenant_id.as_deref(), Some("t"));

        let cognito: CredentialClaims =
            serde_json::from_value(serde_json::json!({ "sub": "s", "custom:tenantId": "t", "exp": 1 })).unwrap();
        assert_eq!(cognito.tenant_id.as_deref(), Some("t"));

        let missing: CredentialClaims =
            serde_json::from_value(serde_json::json!({ "sub": "s", "exp": 1 })).unwrap();
        assert_eq!(missing.tenant_id, None);
    }
}
