use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Query, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use tamv_auth::{Capability, Principal};

use crate::app::dto::{self, AuditQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1_000;

pub fn router() -> Router {
    Router::new().route("/events", get(list_events))
}

/// Most recent audit events of the caller's tenant, oldest first.
pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::ViewAudit)?;
    let query = dto::query(query)?;

    let limit = match query.limit.as_deref() {
        None => DEFAULT_LIMIT,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if (1..=MAX_LIMIT).contains(&n) => n,
            _ => return Err(ApiError::validation(format!("limit must be between 1 and {MAX_LIMIT}"))),
        },
    };

    let Some(log) = services.audit_log.as_ref() else {
        return Err(ApiError::NotFound);
    };

    let events = log.for_tenant(ctx.tenant_id());
    let skip = events.len().saturating_sub(limit);
    let items: Vec<_> = events.into_iter().skip(skip).collect();

    Ok((StatusCode::OK, Json(json!({ "items": items }))).into_response())
}
