// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::jobs::{CommandProcessor, JobRunner, Processor};
use crate::live::BroadcastHub;
use crate::staging::Staging;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    pub config: ServerConfig,
    /// Flat directory of uploads and surgery outputs.
    pub staging: Arc<Staging>,
    /// Connected WebSocket clients.
    pub hub: Arc<BroadcastHub>,
    /// Runs the surgeon and streams its progress to `hub`.
    pub jobs: Arc<JobRunner>,
}

impl AppState {
    /// State backed by the configured external processor.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let processor = CommandProcessor::new(
            config.processor_program.clone(),
            config.processor_args.clone(),
        );
        Self::with_processor(config, Arc::new(processor))
    }

    /// State with a caller-supplied processor (used by tests).
    pub fn with_processor(config: ServerConfig, processor: Arc<dyn Processor>) -> Arc<Self> {
        let hub = BroadcastHub::shared();
        let jobs = JobRunner::new(processor, Arc::clone(&hub)).with_timeout(config.job_timeout);
        Arc::new(Self {
            start_time: Instant::now(),
            staging: Arc::new(Staging::new(config.staging_dir.clone())),
            hub,
            jobs: Arc::new(jobs),
            config,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
