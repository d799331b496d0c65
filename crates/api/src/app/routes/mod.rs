use axum::{
    Router,
    routing::{get, post},
};

pub mod audit;
pub mod auth;
pub mod posts;
pub mod system;
pub mod tasks;
pub mod users;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/auth/logout", post(auth::logout))
        .nest("/tasks", tasks::router())
        .nest("/posts", posts::router())
        .nest("/users", users::router())
        .nest("/audit", audit::router())
}
