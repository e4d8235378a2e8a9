//! HTTP API
//!
//! Routes the JSON and streaming endpoints onto the file gateway, and
//! optionally serves a static UI for every other path.

pub mod handlers;
pub mod requests;
pub mod responses;

use std::path::PathBuf;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::services::ServeDir;

use crate::middleware::{cors_layer, log_requests};

pub use handlers::AppState;
pub use responses::ApiError;

/// Build the application router
pub fn router(state: AppState, public_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/api/list", get(handlers::list_entries))
        .route(
            "/api/quota",
            get(handlers::get_quota).post(handlers::set_quota),
        )
        .route("/api/mkdir", post(handlers::mkdir))
        .route("/api/rename", post(handlers::rename))
        .route("/api/delete", post(handlers::delete))
        .route("/api/upload", post(handlers::upload))
        .route("/api/download", get(handlers::download));

    let app = match public_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(DefaultBodyLimit::disable())
        .layer(cors_layer())
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}
