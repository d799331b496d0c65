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
use tamv_infra::store::AccessError;
use tamv_records::{Comment, NewComment, NewPost, Post, PostPatch};

use crate::app::dto::{self, PageQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/:id", get(get_post).put(update_post).delete(delete_post))
        .route("/:id/comments", get(list_comments).post(create_comment))
}

/// Newest first.
pub async fn list_posts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::Read)?;
    let page = dto::query(query)?.page()?;

    let mut posts = services.accessor::<Post>(&ctx).list().await?;
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok((StatusCode::OK, Json(page.apply(posts))).into_response())
}

pub async fn create_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::Write)?;
    services
        .post_limiter
        .check(&format!("{}:{}", ctx.tenant_id(), ctx.actor()))?;
    let input: NewPost = dto::parse_json(&body)?;

    let post = Post::create(input, ctx.actor(), Utc::now())?;
    services.accessor::<Post>(&ctx).create(&post).await?;

    services.audit_as(&ctx, "post.created", json!({ "post_id": post.id }));
    Ok((StatusCode::CREATED, Json(post)).into_response())
}

pub async fn get_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::Read)?;
    let id = dto::parse_record_id(&id)?;
    let post = services.accessor::<Post>(&ctx).get(id).await?;
    Ok((StatusCode::OK, Json(post)).into_response())
}

/// Only the author edits a post, whatever their role.
pub async fn update_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::Write)?;
    let id = dto::parse_record_id(&id)?;

    let posts = services.accessor::<Post>(&ctx);
    let mut post = posts.get(id).await?;
    if !post.is_authored_by(ctx.actor()) {
        return Err(ApiError::Forbidden("only the author may edit a post".to_string()));
    }
    let patch: PostPatch = dto::parse_json(&body)?;
    post.apply(patch, Utc::now())?;
    posts.update(&post).await?;

    services.audit_as(&ctx, "post.updated", json!({ "post_id": post.id }));
    Ok((StatusCode::OK, Json(post)).into_response())
}

pub async fn delete_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ctx = authz::require(&principal, Capability::Delete)?;
    let id = dto::parse_record_id(&id)?;

    services.accessor::<Post>(&ctx).delete(id).await?;

    let comments = services.accessor::<Comment>(&ctx);
    match comments.list().await {
        Ok(all) => {
            for comment in all.into_iter().filter(|c| c.post_id == id) {
                match comments.delete(comment.id).await {
                    Ok(()) | Err(AccessError::NotFound) => {}
                    Err(e) => tracing::warn!(error = %e, comment_id = %comment.id, "orphaned comment not removed"),
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, post_id = %id, "comments of deleted post not removed"),
    }

    services.audit_as(&ctx, "post.deleted", json!({ "post_id": id }));
    Ok(StatusCode::NO_CONTENT)
}

/// Oldest first.
pub async fn list_comments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::Read)?;
    let id = dto::parse_record_id(&id)?;
    let page = dto::query(query)?.page()?;

    services.accessor::<Post>(&ctx).get(id).await?;
    let mut comments: Vec<Comment> = services
        .accessor::<Comment>(&ctx)
        .list()
        .await?
        .into_iter()
        .filter(|c| c.post_id == id)
        .collect();
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok((StatusCode::OK, Json(page.apply(comments))).into_response())
}

pub async fn create_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = authz::require(&principal, Capability::Write)?;
    let id = dto::parse_record_id(&id)?;

    let post = services.accessor::<Post>(&ctx).get(id).await?;
    let input: NewComment = dto::parse_json(&body)?;
    let comment = Comment::create(post.id, input, ctx.actor(), Utc::now())?;
    services.accessor::<Comment>(&ctx).create(&comment).await?;

    services.audit_as(
        &ctx,
        "comment.created",
        json!({ "post_id": post.id, "comment_id": comment.id }),
    );
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}
