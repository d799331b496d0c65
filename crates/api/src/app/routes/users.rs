//! Tenant user directory.
//!
//! Role changes follow one rule: nobody hands out, takes away or touches a
//! role above their own. Only owners grant `owner` or modify an owner.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{Path, Query, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde_json::json;

use tamv_auth::{AuthorizedContext, Capability, Principal, Role, RoleSet};
use tamv_core::UserId;
use tamv_records::{UserProfile, UserProfilePatch};

use crate::app::accounts;
use crate::app::dto::{self, NewUserRequest, PageQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
}

fn ensure_may_grant(ctx: &AuthorizedContext, roles: RoleSet) -> Result<(), ApiError> {
    match roles.iter().find(|r| !ctx.may_grant(*r)) {
        Some(role) => Err(ApiError::Forbidden(format!("may not grant role '{role}'"))),
        None => Ok(()),
    }
}

fn ensure_may_manage(ctx: &AuthorizedContext, target: &UserProfile) -> Result<(), ApiError> {
    if target.roles.contains(Role::Owner) && !ctx.may_grant(Role::Owner) {
        return Err(ApiError::Forbidden("only owners may modify an owner".to_string()));
    }
    Ok(())
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::ManageUsers)?;
    let page = dto::query(query)?.page()?;

    let mut users = services.accessor::<UserProfile>(&ctx).list().await?;
    users.sort_by(|a, b| a.email.cmp(&b.email));
    Ok((StatusCode::OK, Json(page.apply(users))).into_response())
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::ManageUsers)?;
    let request: NewUserRequest = dto::parse_json(&body)?;
    ensure_may_grant(&ctx, request.profile.requested_roles())?;

    let profile = UserProfile::create(UserId::new(), request.profile, ctx.actor(), Utc::now())?;
    accounts::create_account(&services, &ctx, &profile, request.password).await?;

    services.audit_as(
        &ctx,
        "user.created",
        json!({ "user_id": profile.id, "roles": profile.roles }),
    );
    Ok((StatusCode::CREATED, Json(profile)).into_response())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::ManageUsers)?;
    let id = dto::parse_record_id(&id)?;
    let profile = services.accessor::<UserProfile>(&ctx).get(id).await?;
    Ok((StatusCode::OK, Json(profile)).into_response())
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::ManageUsers)?;
    let id = dto::parse_record_id(&id)?;
    let patch: UserProfilePatch = dto::parse_json(&body)?;

    let users = services.accessor::<UserProfile>(&ctx);
    let mut profile = users.get(id).await?;
    ensure_may_manage(&ctx, &profile)?;
    if let Some(roles) = patch.roles {
        ensure_may_grant(&ctx, roles)?;
    }

    profile.apply(patch, Utc::now())?;
    users.update(&profile).await?;

    services.audit_as(
        &ctx,
        "user.updated",
        json!({ "user_id": profile.id, "roles": profile.roles, "status": profile.status }),
    );
    Ok((StatusCode::OK, Json(profile)).into_response())
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ctx = authz::require(&principal, Capability::ManageUsers)?;
    let id = dto::parse_record_id(&id)?;

    let profile = services.accessor::<UserProfile>(&ctx).get(id).await?;
    ensure_may_manage(&ctx, &profile)?;
    accounts::delete_account(&services, &ctx, &profile).await?;

    services.audit_as(&ctx, "user.deleted", json!({ "user_id": id }));
    Ok(StatusCode::NO_CONTENT)
}
