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

use tamv_auth::{Capability, Principal};
use tamv_records::{NewTask, Task, TaskPatch, TaskStatus};

use crate::app::dto::{self, TaskListQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task).patch(update_task).delete(delete_task))
}

pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<TaskListQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::Read)?;
    let query = dto::query(query)?;
    let page = dto::Page::parse(query.limit.as_deref(), query.offset.as_deref())?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()?;

    let mut items: Vec<Task> = services
        .accessor::<Task>(&ctx)
        .list()
        .await?
        .into_iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .collect();
    items.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    Ok((StatusCode::OK, Json(page.apply(items))).into_response())
}

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::Write)?;
    let input: NewTask = dto::parse_json(&body)?;

    let task = Task::create(input, ctx.actor(), Utc::now())?;
    services.accessor::<Task>(&ctx).create(&task).await?;

    services.audit_as(&ctx, "task.created", json!({ "task_id": task.id, "title": task.title }));
    Ok((StatusCode::CREATED, Json(task)).into_response())
}

pub async fn get_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::Read)?;
    let id = dto::parse_record_id(&id)?;

    let task = services.accessor::<Task>(&ctx).get(id).await?;
    Ok((StatusCode::OK, Json(task)).into_response())
}

pub async fn update_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::Write)?;
    let id = dto::parse_record_id(&id)?;
    let patch: TaskPatch = dto::parse_json(&body)?;

    let tasks = services.accessor::<Task>(&ctx);
    let mut task = tasks.get(id).await?;
    task.apply(patch, Utc::now())?;
    tasks.update(&task).await?;

    services.audit_as(&ctx, "task.updated", json!({ "task_id": task.id, "status": task.status }));
    Ok((StatusCode::OK, Json(task)).into_response())
}

pub async fn delete_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ctx = authz::require(&principal, Capability::Delete)?;
    let id = dto::parse_record_id(&id)?;

    services.accessor::<Task>(&ctx).delete(id).await?;

    services.audit_as(&ctx, "task.deleted", json!({ "task_id": id }));
    Ok(StatusCode::NO_CONTENT)
}
