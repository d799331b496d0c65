use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use tamv_auth::Principal;

use crate::app::errors::ApiError;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Router fallback.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn whoami(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(serde_json::json!({
        "tenant_id": principal.tenant_id().to_string(),
        "subject": principal.subject().to_string(),
        "roles": principal.roles(),
        "email": principal.email(),
        "expires_at": principal.expires_at(),
    }))
}
