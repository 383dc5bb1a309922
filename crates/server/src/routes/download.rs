// crates/server/src/routes/download.rs
//! `GET /download/{filename}`: stream a staged file back as an attachment.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio_util::io::ReaderStream;

use crate::error::ApiResult;
use crate::staging::StagingError;
use crate::state::AppState;

const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/download/{filename}", get(download))
}

/// GET /download/{filename}
///
/// Any plain name in the staging directory can be fetched; names with path
/// components are rejected.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let path = state.staging.resolve(&filename).await?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|source| StagingError::Io {
            path: path.clone(),
            source,
        })?;

    tracing::info!(filename = %filename, "Serving download");

    let headers = [
        (header::CONTENT_TYPE, content_type(&filename).to_string()),
        (header::CONTENT_DISPOSITION, attachment(&filename)),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

fn content_type(filename: &str) -> &'static str {
    if filename.to_ascii_lowercase().ends_with(".pptx") {
        PPTX_CONTENT_TYPE
    } else {
        "application/octet-stream"
    }
}

fn attachment(filename: &str) -> String {
    let quoted: String = filename
        .chars()
        .filter(|c| *c != '"' && !c.is_control())
        .collect();
    format!("attachment; filename=\"{quoted}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_header() {
        assert_eq!(
            attachment("nice_deck.pptx"),
            "attachment; filename=\"nice_deck.pptx\""
        );
        assert_eq!(attachment("a\"b.pptx"), "attachment; filename=\"ab.pptx\"");
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("nice_deck.PPTX"), PPTX_CONTENT_TYPE);
        assert_eq!(content_type("notes.txt"), "application/octet-stream");
    }
}
