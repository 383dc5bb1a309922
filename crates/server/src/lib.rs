// crates/server/src/lib.rs
//! PPTX surgeon web server library.
//!
//! Wraps the external font-surgery tool in an HTTP API: upload a
//! presentation, analyze its fonts, run a surgery pass, download the result.
//! Progress is pushed to every connected browser over a WebSocket.

pub mod config;
pub mod error;
pub mod jobs;
pub mod live;
pub mod port;
pub mod routes;
pub mod staging;
pub mod state;

pub use config::{Cli, ServerConfig};
pub use error::*;
pub use port::{bind_with_retry, BindError};
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use pptx_surgeon_observability::http_trace_layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (upload, analyze, process, download, ws, health)
/// - Static assets as the fallback, when a static directory is configured
/// - Upload size limit
/// - CORS (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let body_limit = state.config.max_upload_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(api_routes(state));
    if let Some(dir) = static_dir {
        tracing::info!(path = %dir.display(), "Serving static assets");
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(http_trace_layer())
}

// ============================================================================
// Integration Tests
// ============================================================================
