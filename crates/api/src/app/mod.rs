//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: verifier, store, audit pipeline and limiter wiring
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `accounts.rs`: profile, login and email reservation records
//! - `dto.rs`: request/response DTOs, body/query parsing and pagination
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{StatusCode, header},
    response::Response,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::{middleware, rate_limit};

pub mod accounts;
pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, ServiceError};

/// Build the full HTTP router from configuration (entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> Result<Router, ServiceError> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(build_router(services))
}

/// Build the router around already-wired services.
pub fn build_router(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        verifier: services.verifier.clone(),
    };

    // Protected routes: require a verified principal.
    let protected = routes::router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    // Public credential endpoints, limited per client address.
    let credentials = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route_layer(axum::middleware::from_fn_with_state(
            services.auth_limiter.clone(),
            rate_limit::limit_by_client,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(credentials)
        .merge(protected)
        .fallback(routes::system::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::map_response(structured_errors))
                .layer(Extension(services)),
        )
}

/// Framework-generated failures (unmatched method, oversized body) come back
/// as plain text; give them the same JSON shape as handler errors.
async fn structured_errors(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let (code, message) = match status {
        StatusCode::NOT_FOUND => ("NotFound", "not found"),
        StatusCode::METHOD_NOT_ALLOWED => ("MethodNotAllowed", "method not allowed"),
        StatusCode::PAYLOAD_TOO_LARGE => ("PayloadTooLarge", "request body too large"),
        s if s.is_client_error() => ("ValidationError", "invalid request"),
        _ => ("InternalError", "internal error"),
    };
    let mut structured = errors::json_error(status, code, message);
    if let Some(allow) = response.headers().get(header::ALLOW) {
        structured.headers_mut().insert(header::ALLOW, allow.clone());
    }
    structured
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}
