//! Route configuration.

use crate::config::CorsOrigins;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
///
/// Trailing slashes are part of every path.
pub fn create_router(state: AppState, cors: &CorsOrigins) -> Router {
    Router::new()
        .route("/test/ping/", get(handlers::ping))
        .route("/test/download/", get(handlers::download))
        // Uploads are measured, not stored, so no size limit applies
        .route(
            "/test/upload/",
            post(handlers::upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/test/network-info/", get(handlers::network_info))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browser clients on other origins must be able to time these endpoints
/// and read the download's declared length.
fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    match origins {
        CorsOrigins::Any => CorsLayer::permissive(),
        CorsOrigins::List(list) => CorsLayer::new()
            .allow_origin(list.clone())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE])
            .expose_headers([CONTENT_LENGTH])
            .max_age(std::time::Duration::from_secs(3600)),
    }
}
