// crates/server/src/routes/process.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use pptx_surgeon_types::{ProcessRequest, ProcessResponse};

use crate::error::{ApiError, ApiResult};
use crate::jobs::SurgeryRequest;
use crate::staging::Staging;
use crate::state::AppState;

pub const SUCCESS_MESSAGE: &str = "Font surgery completed successfully!";

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/process", post(process))
}

/// POST /process
///
/// Runs a surgery pass over a staged upload. The output is written next to
/// it as `nice_<originalName>`; when `originalName` is missing it is
/// recovered from the stored name.
pub async fn process(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<Json<ProcessResponse>> {
    let Json(request) = payload?;
    if request.filename.trim().is_empty() {
        return Err(ApiError::BadRequest("filename is required".into()));
    }

    let input = state.staging.resolve(&request.filename).await?;

    let original_name = request
        .original_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| Staging::original_name_of(&request.filename));
    let output_name = state.staging.output_name(original_name)?;
    let output = state.staging.path_for(&output_name)?;

    let outcome = state
        .jobs
        .surgery(SurgeryRequest {
            input,
            output,
            output_name,
            options: request.options,
        })
        .await?;

    Ok(Json(ProcessResponse {
        success: true,
        output_file: outcome.output_name,
        message: SUCCESS_MESSAGE.to_string(),
    }))
}
