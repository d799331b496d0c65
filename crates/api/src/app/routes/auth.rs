//! Credential lifecycle: sign-up, password login, refresh and logout.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use tamv_auth::{Capability, CredentialError, Principal, Role, RoleSet};
use tamv_core::{RecordId, TenantId, UserId};
use tamv_infra::store::AccessError;
use tamv_records::{EmailClaim, NewUserProfile, PasswordLogin, UserProfile, normalize_email};

use crate::app::accounts;
use crate::app::dto::{self, LoginRequest, RefreshRequest, RegisterRequest, SessionResponse, TokenResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;

fn bad_login() -> ApiError {
    CredentialError::invalid("invalid email or password").into()
}

/// Create a tenant with the caller as its owner and sign them in.
pub async fn register(Extension(services): Extension<Arc<AppServices>>, body: Bytes) -> Result<Response, ApiError> {
    let request: RegisterRequest = dto::parse_json(&body)?;
    let now = Utc::now();

    let tenant_id = TenantId::new();
    let user = UserId::new();
    let roles = RoleSet::from(Role::Owner);
    let founder = Principal::new(user, tenant_id, roles, now + services.issuer.ttl());
    let ctx = authz::require(&founder, Capability::ManageUsers)?;

    let profile = UserProfile::create(
        user,
        NewUserProfile {
            email: request.email,
            full_name: request.full_name,
            roles: Some(roles),
        },
        user,
        now,
    )?;
    accounts::create_account(&services, &ctx, &profile, Some(request.password)).await?;

    let issued = services
        .issuer
        .issue(user, tenant_id, profile.roles, Some(&profile.email), now)?;
    services.audit_as(&ctx, "auth.registered", json!({ "user_id": profile.id }));
    Ok((StatusCode::CREATED, Json(SessionResponse::new(issued, tenant_id, profile))).into_response())
}

/// Exchange tenant, email and password for a credential.
///
/// Unknown tenant, unknown address, wrong password and disabled account all
/// get the same answer.
pub async fn login(Extension(services): Extension<Arc<AppServices>>, body: Bytes) -> Result<Response, ApiError> {
    let request: LoginRequest = dto::parse_json(&body)?;
    let tenant_id: TenantId = request.tenant_id.parse().map_err(|_| bad_login())?;
    let email = normalize_email(&request.email).map_err(|_| bad_login())?;

    let identities = services.identities(tenant_id);
    let claim: EmailClaim = identities.get(EmailClaim::id_for(&email)).await.map_err(lookup_failure)?;
    let profile: UserProfile = identities
        .get(RecordId::from(claim.user_id))
        .await
        .map_err(lookup_failure)?;
    let stored: PasswordLogin = identities.get(profile.id).await.map_err(lookup_failure)?;

    if !accounts::verify_password(request.password, stored.password_hash).await? {
        tracing::info!(%tenant_id, user_id = %profile.id, "password rejected");
        return Err(bad_login());
    }
    if !profile.is_active() {
        tracing::info!(%tenant_id, user_id = %profile.id, "login to disabled account");
        return Err(bad_login());
    }

    let now = Utc::now();
    let issued = services
        .issuer
        .issue(profile.user_id(), tenant_id, profile.roles, Some(&profile.email), now)?;
    services.record_audit(tenant_id, profile.user_id(), "auth.login", json!({ "credential_id": issued.credential_id }));
    Ok((StatusCode::OK, Json(SessionResponse::new(issued, tenant_id, profile))).into_response())
}

fn lookup_failure(err: AccessError) -> ApiError {
    match err {
        AccessError::NotFound => bad_login(),
        other => ApiError::from(other),
    }
}

/// Exchange a still-valid credential for a fresh one.
///
/// The new credential carries the user's current roles and email from the
/// directory; a deleted or disabled user cannot refresh. The old credential
/// is revoked first, and only the request that revoked it gets a new one.
pub async fn refresh(Extension(services): Extension<Arc<AppServices>>, body: Bytes) -> Result<Response, ApiError> {
    let request: RefreshRequest = dto::parse_json(&body)?;
    let now = Utc::now();

    let principal = services.verifier.verify(&request.token, now)?;
    let Some(old) = principal.credential_id() else {
        return Err(CredentialError::invalid("credential carries no id and cannot be refreshed").into());
    };

    let profile: UserProfile = match services
        .identities(principal.tenant_id())
        .get::<UserProfile>(RecordId::from(principal.subject()))
        .await
    {
        Ok(profile) if profile.is_active() => profile,
        Ok(_) | Err(AccessError::NotFound) => {
            tracing::info!(tenant_id = %principal.tenant_id(), actor = %principal.subject(), "refresh for unknown or disabled user");
            return Err(CredentialError::invalid("user is not active").into());
        }
        Err(e) => return Err(e.into()),
    };

    if !services.revocations.revoke(old, principal.expires_at(), now) {
        return Err(CredentialError::invalid("credential already refreshed or revoked").into());
    }
    let issued = services
        .issuer
        .refresh(&principal, profile.roles, Some(&profile.email), now)?;

    services.record_audit(
        principal.tenant_id(),
        principal.subject(),
        "auth.refreshed",
        json!({ "credential_id": issued.credential_id }),
    );
    Ok((StatusCode::OK, Json(TokenResponse::from(issued))).into_response())
}

/// Revoke the credential used for this request.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> Result<StatusCode, ApiError> {
    let Some(credential_id) = principal.credential_id() else {
        return Err(ApiError::validation("credential carries no id and cannot be revoked"));
    };

    services
        .revocations
        .revoke(credential_id, principal.expires_at(), Utc::now());
    services.record_audit(
        principal.tenant_id(),
        principal.subject(),
        "auth.logout",
        json!({ "credential_id": credential_id }),
    );
    Ok(StatusCode::NO_CONTENT)
}
