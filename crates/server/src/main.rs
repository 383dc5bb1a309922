// crates/server/src/main.rs
//! PPTX surgeon web server binary.
//!
//! Parses configuration, sets up logging, binds the first free port at or
//! above the requested one and serves until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use pptx_surgeon_observability::init_tracing;
use pptx_surgeon_server::{bind_with_retry, create_app, AppState, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held until exit so the file writer flushes.
    let _log_guard = init_tracing(&cli.log_config()).context("failed to initialize logging")?;

    let config = cli.server_config();
    tracing::info!(
        processor = %config.processor_program,
        processor_args = ?config.processor_args,
        staging_dir = %config.staging_dir.display(),
        job_timeout_secs = config.job_timeout.map(|t| t.as_secs()),
        "Starting pptx-surgeon-web"
    );

    let listener = bind_with_retry(config.host, config.port, config.max_port_attempts).await?;
    let addr = listener.local_addr()?;

    let state = AppState::new(config);
    let app = create_app(state);

    eprintln!("\n  pptx-surgeon-web v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  \u{2192} http://{addr}\n");
    tracing::info!(%addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
