//! Request/response DTOs and body/path parsing helpers.
//!
//! Bodies arrive as raw bytes and are decoded only after the handler has
//! authorized the request.

use axum::body::Bytes;
use axum::extract::Query;
use axum::extract::rejection::QueryRejection;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use tamv_auth::IssuedCredential;
use tamv_core::{RecordId, TenantId};
use tamv_records::{NewUserProfile, UserProfile};

use crate::app::errors::ApiError;

pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::validation("request body is required"));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::validation(format!("invalid request body: {e}")))
}

/// Query strings are extracted as `Result` and decoded here, after
/// authorization, so a malformed query is a JSON `ValidationError`.
pub fn query<T>(extracted: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    extracted
        .map(|Query(q)| q)
        .map_err(|rejection| ApiError::validation(format!("invalid query string: {}", rejection.body_text())))
}

/// A path id that is not a record id cannot name any record.
pub fn parse_record_id(raw: &str) -> Result<RecordId, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 100;

/// `limit`/`offset` window over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self, ApiError> {
        let limit = match limit {
            None => DEFAULT_PAGE_LIMIT,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if (1..=MAX_PAGE_LIMIT).contains(&n) => n,
                _ => return Err(ApiError::validation(format!("limit must be between 1 and {MAX_PAGE_LIMIT}"))),
            },
        };
        let offset = match offset {
            None => 0,
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| ApiError::validation("offset must be a non-negative integer"))?,
        };
        Ok(Self { limit, offset })
    }

    pub fn apply<T: Serialize>(self, items: Vec<T>) -> Paged<T> {
        let total = items.len();
        Paged {
            items: items.into_iter().skip(self.offset).take(self.limit).collect(),
            total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> Result<Page, ApiError> {
        Page::parse(self.limit.as_deref(), self.offset.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub tenant_id: String,
    pub email: String,
    pub password: String,
}

/// Directory entry plus an optional initial password.
#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    #[serde(flatten)]
    pub profile: NewUserProfile,
    #[serde(default)]
    pub password: Option<String>,
}

/// Credential plus the profile it was minted for.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub tenant_id: TenantId,
    pub user: UserProfile,
}

impl SessionResponse {
    pub fn new(issued: IssuedCredential, tenant_id: TenantId, user: UserProfile) -> Self {
        Self {
            token: issued.token,
            token_type: "Bearer",
            expires_at: issued.expires_at,
            tenant_id,
            user,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedCredential> for TokenResponse {
    fn from(issued: IssuedCredential) -> Self {
        Self {
            token: issued.token,
            token_type: "Bearer",
            expires_at: issued.expires_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<String>,
}
