//! Logging setup for the surgeon web server.
//!
//! One global `tracing` subscriber: a stderr layer (compact text or JSON) and,
//! when a log directory is configured, a daily-rolling JSON file written
//! through a non-blocking appender. Both honour `RUST_LOG`, falling back to
//! [`DEFAULT_FILTER`].

use std::path::PathBuf;

use anyhow::Context;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn,pptx_surgeon_server=info,tower_http=info";

/// File name prefix for rolling log files.
pub const LOG_FILE_PREFIX: &str = "pptx-surgeon.log";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Directory for rolling log files. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

/// Keeps the non-blocking file writer alive. Drop it last, on shutdown, so
/// buffered lines are flushed.
#[must_use = "dropping the guard stops the file log writer"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<LogGuard> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let stderr = fmt::layer().with_writer(std::io::stderr);
    layers.push(match config.format {
        LogFormat::Text => stderr.compact().with_filter(env_filter()).boxed(),
        LogFormat::Json => stderr.json().with_filter(env_filter()).boxed(),
    });

    let mut file_guard = None;
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .with_filter(env_filter())
                .boxed(),
        );
        file_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("installing global tracing subscriber")?;

    Ok(LogGuard { _file: file_guard })
}

/// Request/response tracing for the HTTP router, logged at INFO.
pub fn http_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}
