//! Consistent JSON error responses: `{"error": <code>, "message": <text>}`.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use tamv_auth::{AuthzError, CredentialError, IssueError, PasswordError};
use tamv_core::DomainError;
use tamv_infra::store::AccessError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Details are logged where the error happens and never returned.
    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Credential(e) => e.code(),
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::NotFound => "NotFound",
            ApiError::Validation(_) => "ValidationError",
            ApiError::Conflict(_) => "Conflict",
            ApiError::RateLimited { .. } => "RateLimited",
            ApiError::Internal => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Credential(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = json_error(self.status(), self.code(), self.to_string());
        if let ApiError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Forbidden(capability) => ApiError::Forbidden(format!("missing capability '{capability}'")),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotFound => ApiError::NotFound,
            AccessError::Conflict => ApiError::Conflict("record already exists".to_string()),
            AccessError::Store(e) => {
                tracing::error!(error = %e, "tenant store failure");
                ApiError::Internal
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<IssueError> for ApiError {
    fn from(err: IssueError) -> Self {
        tracing::error!(error = %err, "credential issuance failed");
        ApiError::Internal
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Policy => ApiError::Validation(err.to_string()),
            PasswordError::Hashing(e) => {
                tracing::error!(error = %e, "password hashing failed");
                ApiError::Internal
            }
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tamv_auth::Capability;
    use tamv_infra::store::StoreError;

    #[test]
    fn credential_errors_are_unauthorized_with_their_own_code() {
        for (err, code) in [
            (CredentialError::invalid("x"), "InvalidCredential"),
            (CredentialError::ExpiredCredential, "ExpiredCredential"),
            (CredentialError::MissingTenantClaim, "MissingTenantClaim"),
        ] {
            let api = ApiError::from(err);
            assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn forbidden_names_the_capability() {
        let api = ApiError::from(AuthzError::Forbidden(Capability::Delete));
        assert_eq!(api.status(), StatusCode::FORBIDDEN);
        assert_eq!(api.to_string(), "forbidden: missing capability 'delete'");
    }

    #[test]
    fn store_failures_hide_details() {
        let api = ApiError::from(AccessError::Store(StoreError::Unavailable("password=hunter2".to_string())));
        assert_eq!(api, ApiError::Internal);
        assert_eq!(api.to_string(), "internal error");
    }

    #[test]
    fn domain_validation_is_bad_request() {
        let api = ApiError::from(DomainError::Required { field: "title" });
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.code(), "ValidationError");
        assert_eq!(api.to_string(), "title is required");
    }

    #[test]
    fn rate_limited_carries_retry_after() {
        let response = ApiError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn password_policy_is_validation_and_hashing_is_internal() {
        assert_eq!(ApiError::from(PasswordError::Policy).code(), "ValidationError");
        assert_eq!(ApiError::from(PasswordError::Hashing("rng".into())), ApiError::Internal);
    }
}
