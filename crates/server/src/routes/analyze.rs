// crates/server/src/routes/analyze.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use pptx_surgeon_types::{AnalyzeRequest, AnalyzeResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/analyze", post(analyze))
}

/// POST /analyze
///
/// Runs the surgeon in dump mode over a staged upload and returns its raw
/// output. Unknown files are rejected before anything is broadcast.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let Json(request) = payload?;
    if request.filename.trim().is_empty() {
        return Err(ApiError::BadRequest("filename is required".into()));
    }

    let input = state.staging.resolve(&request.filename).await?;
    let analysis = state.jobs.analyze(&input).await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis,
    }))
}
