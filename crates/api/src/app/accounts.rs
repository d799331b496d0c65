//! Account records that move together: the email reservation, the password
//! login and the directory profile.
//!
//! The reservation is inserted first. Its id is derived from the address, so
//! the store's uniqueness on `(tenant, kind, id)` decides which of two
//! concurrent sign-ups with one address wins.

use tamv_auth::AuthorizedContext;
use tamv_infra::store::AccessError;
use tamv_records::{EmailClaim, PasswordLogin, UserProfile};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// Store a new account. With `password`, the user can also sign in with it.
pub async fn create_account(
    services: &AppServices,
    ctx: &AuthorizedContext,
    profile: &UserProfile,
    password: Option<String>,
) -> Result<(), ApiError> {
    let password_hash = match password {
        Some(password) => Some(hash_password(password).await?),
        None => None,
    };

    let claim = EmailClaim::new(&profile.email, profile.user_id());
    let claims = services.accessor::<EmailClaim>(ctx);
    claims.create(&claim).await.map_err(|e| match e {
        AccessError::Conflict => ApiError::Conflict(format!("email '{}' is already registered", profile.email)),
        other => ApiError::from(other),
    })?;

    let logins = services.accessor::<PasswordLogin>(ctx);
    let stored = async {
        if let Some(hash) = password_hash {
            logins
                .create(&PasswordLogin::new(profile.user_id(), hash, profile.created_at))
                .await?;
        }
        services.accessor::<UserProfile>(ctx).create(profile).await
    }
    .await;

    if let Err(e) = stored {
        forget(logins.delete(profile.id).await, "password login");
        forget(claims.delete(claim.id).await, "email reservation");
        return Err(e.into());
    }
    Ok(())
}

/// Remove a profile, then the records that only exist for it.
pub async fn delete_account(services: &AppServices, ctx: &AuthorizedContext, profile: &UserProfile) -> Result<(), ApiError> {
    services.accessor::<UserProfile>(ctx).delete(profile.id).await?;

    forget(
        services.accessor::<PasswordLogin>(ctx).delete(profile.id).await,
        "password login",
    );
    forget(
        services
            .accessor::<EmailClaim>(ctx)
            .delete(EmailClaim::id_for(&profile.email))
            .await,
        "email reservation",
    );
    Ok(())
}

/// Cleanup result: a missing record is already gone, anything else is logged.
fn forget(result: Result<(), AccessError>, what: &'static str) {
    match result {
        Ok(()) | Err(AccessError::NotFound) => {}
        Err(e) => tracing::warn!(error = %e, record = what, "account cleanup failed"),
    }
}

/// argon2 on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || tamv_auth::hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing task failed");
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

pub async fn verify_password(password: String, stored_hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || tamv_auth::verify_password(&password, &stored_hash))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password verification task failed");
            ApiError::Internal
        })
}
