use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, middleware::Next, response::Response};
use chrono::Utc;

use tamv_auth::{CredentialError, CredentialVerifier};

use crate::app::errors::ApiError;

#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn CredentialVerifier>,
}

/// Verify the bearer credential and attach the resulting `Principal` to the
/// request. Nothing behind this layer runs for an unauthenticated request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let principal = state.verifier.verify(token, Utc::now()).map_err(|e| {
        tracing::info!(code = e.code(), reason = %e, "credential rejected");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let missing = || ApiError::from(CredentialError::invalid("missing bearer credential"));

    let header = headers.get(axum::http::header::AUTHORIZATION).ok_or_else(missing)?;
    let header = header.to_str().map_err(|_| missing())?;

    let (scheme, token) = header.split_once(' ').ok_or_else(missing)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(missing());
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(missing());
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(extract_bearer(&headers("bearer  abc ")).unwrap(), "abc");
    }

    #[test]
    fn rejects_missing_or_foreign_schemes() {
        assert!(extract_bearer(&HeaderMap::new()).is_err());
        assert!(extract_bearer(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_bearer(&headers("Bearer ")).is_err());
        assert!(extract_bearer(&headers("Bearer")).is_err());
        assert_eq!(extract_bearer(&headers("Token x")).unwrap_err().code(), "InvalidCredential");
    }
}
