pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod models;
pub mod repo;
pub mod services;
pub mod storage;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::mail::Mailer;
use crate::services::FileLifecycle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub lifecycle: Arc<FileLifecycle>,
    pub mailer: Arc<dyn Mailer>,
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/verify-email", get(handlers::auth::verify_email))
        .route("/auth/forgot-password", post(handlers::auth::forgot_password))
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        // File feed, search, and download are public, as in the original app
        .route("/files", get(handlers::file::list_files))
        .route("/files/:id", get(handlers::file::search_file))
        .route("/files/:id/download", get(handlers::file::download_file));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/files/upload", post(handlers::file::upload_file))
        .route("/files/:id", delete(handlers::file::delete_file))
        .route("/files/:id/share", post(handlers::file::share_file))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine all routes under /api/v1
    Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
