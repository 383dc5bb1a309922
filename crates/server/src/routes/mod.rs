//! Route handlers for the surgeon web server.

pub mod analyze;
pub mod download;
pub mod health;
pub mod live;
pub mod process;
pub mod upload;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - POST /upload - Stage a `.pptx` (multipart field `pptxFile`)
/// - POST /analyze - Dump font metadata of a staged file
/// - POST /process - Run font surgery on a staged file
/// - GET  /download/{filename} - Fetch a staged file as an attachment
/// - GET  /ws - WebSocket feed of progress events
/// - GET  /api/health - Health check
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(upload::router())
        .merge(analyze::router())
        .merge(process::router())
        .merge(download::router())
        .merge(live::router())
        .nest("/api", health::router())
        .with_state(state)
}
