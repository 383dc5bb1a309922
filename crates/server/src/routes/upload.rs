// crates/server/src/routes/upload.rs
//! `POST /upload`: stream one `.pptx` into the staging directory.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{multipart::Field, Multipart, State},
    routing::post,
    Json, Router,
};
use pptx_surgeon_types::UploadResponse;
use tokio::io::AsyncWriteExt;

use crate::error::{ApiError, ApiResult};
use crate::staging::{StagedFile, Staging, StagingError};
use crate::state::AppState;

/// Multipart field carrying the presentation.
pub const UPLOAD_FIELD: &str = "pptxFile";

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/upload", post(upload))
}

/// POST /upload
///
/// Accepts exactly one file in the `pptxFile` field. Other fields are
/// ignored. Any failure after the file was started removes it again.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut staged: Option<StagedFile> = None;

    if let Err(e) = receive(&state.staging, &mut multipart, &mut staged).await {
        if let Some(file) = staged.take() {
            discard(&file.path).await;
        }
        return Err(e);
    }

    let file = staged.ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))?;
    tracing::info!(
        stored_name = %file.stored_name,
        original_name = %file.original_name,
        "Upload staged"
    );

    Ok(Json(UploadResponse {
        success: true,
        filename: file.stored_name,
        original_name: file.original_name,
    }))
}

async fn receive(
    staging: &Staging,
    multipart: &mut Multipart,
    staged: &mut Option<StagedFile>,
) -> ApiResult<()> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        if staged.is_some() {
            return Err(ApiError::BadRequest(
                "Only one file may be uploaded at a time".into(),
            ));
        }

        // Browsers send an empty file name when nothing was picked.
        let Some(uploaded_name) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
        else {
            continue;
        };
        let file = staging.allocate(&uploaded_name).await?;
        let path = file.path.clone();
        *staged = Some(file);
        write_field(field, &path).await?;
    }
    Ok(())
}

async fn write_field(mut field: Field<'_>, path: &Path) -> ApiResult<()> {
    let io_err = |source| StagingError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut out = tokio::fs::File::create(path).await.map_err(io_err)?;
    while let Some(chunk) = field.chunk().await? {
        out.write_all(&chunk).await.map_err(io_err)?;
    }
    out.flush().await.map_err(io_err)?;
    Ok(())
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove rejected upload");
        }
    }
}
