//! Shared fixtures for the server integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use pptx_surgeon_server::jobs::{
    ExitOutcome, Invocation, Processor, ProcessorError, ProcessorEvent,
};
use pptx_surgeon_server::{AppState, ServerConfig};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const BOUNDARY: &str = "surgeon-test-boundary";

/// What the stub writes to `-o`.
pub const OUTPUT_BYTES: &[u8] = b"PK\x03\x04 cleaned deck";

pub const ANALYSIS: &str = "Fonts in deck:\n  Arial (embedded)\n  Gulim\n";

/// Stand-in for the external surgeon. Records every argument vector; writes
/// the output file on surgery runs.
#[derive(Default)]
pub struct StubSurgeon {
    calls: Mutex<Vec<Vec<String>>>,
    failure: Option<String>,
}

impl StubSurgeon {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every run exits 1 with `stderr`.
    pub fn failing(stderr: &str) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(stderr.to_string()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl Processor for StubSurgeon {
    fn invoke(
        &self,
        args: &[String],
        _cancel: CancellationToken,
    ) -> Result<Invocation, ProcessorError> {
        self.calls.lock().unwrap().push(args.to_vec());
        let (tx, invocation) = Invocation::channel();
        let args = args.to_vec();
        let failure = self.failure.clone();
        tokio::spawn(async move {
            for event in script(&args, failure).await {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(invocation)
    }
}

async fn script(args: &[String], failure: Option<String>) -> Vec<ProcessorEvent> {
    if let Some(stderr) = failure {
        return vec![
            ProcessorEvent::Stderr(stderr),
            ProcessorEvent::Exited(ExitOutcome::Exited(1)),
        ];
    }

    if args.first().map(String::as_str) == Some("-d") {
        return vec![
            ProcessorEvent::Stdout(ANALYSIS.to_string()),
            ProcessorEvent::Exited(ExitOutcome::Exited(0)),
        ];
    }

    let output = args
        .iter()
        .position(|a| a == "-o")
        .and_then(|i| args.get(i + 1));
    if let Some(output) = output {
        tokio::fs::write(output, OUTPUT_BYTES).await.unwrap();
    }
    vec![
        ProcessorEvent::Stdout("Removed 1 embedded font\n".to_string()),
        ProcessorEvent::Exited(ExitOutcome::Exited(0)),
    ]
}

pub fn test_state(staging: &std::path::Path, processor: Arc<dyn Processor>) -> Arc<AppState> {
    AppState::with_processor(ServerConfig::with_staging_dir(staging), processor)
}

/// Every run fails to start, as when the configured program is missing.
pub struct MissingSurgeon;

impl Processor for MissingSurgeon {
    fn invoke(
        &self,
        _args: &[String],
        _cancel: CancellationToken,
    ) -> Result<Invocation, ProcessorError> {
        Err(ProcessorError::Spawn {
            program: "node".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        })
    }
}

/// One multipart part: field name, optional file name, content.
pub type Part<'a> = (&'a str, Option<&'a str>, &'a str);

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Send a request and collect status, headers and body.
pub async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

pub async fn send_json(app: axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}
