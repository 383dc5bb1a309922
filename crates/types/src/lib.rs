//! Wire types shared by the HTTP API and the realtime progress channel.
//!
//! Everything here is plain serde data: request/response bodies for the
//! upload, analyze, process and download endpoints, the surgery options a
//! browser submits, and the `ProgressEvent` pushed to every connected viewer.

pub mod api;
pub mod event;
pub mod options;

pub use api::{
    AnalyzeRequest, AnalyzeResponse, HealthResponse, ProcessRequest, ProcessResponse,
    UploadResponse,
};
pub use event::{EventKind, ProgressEvent};
pub use options::{FontCleanup, FontMapping, SurgeryOptions};
