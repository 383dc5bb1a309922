// crates/server/src/jobs/runner.rs
//! Runs surgeon jobs and streams their progress to every connected client.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pptx_surgeon_types::{ProgressEvent, SurgeryOptions};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::args;
use super::processor::{ExitOutcome, Processor, ProcessorEvent};
use super::state::Job;
use super::types::{JobError, JobMode, JobOutput};
use crate::live::BroadcastHub;

/// Placeholder percentage for events emitted while the processor runs.
pub const STREAM_PERCENT: u8 = 70;

const ANALYZE_FALLBACK: &str = "Analysis failed";
const PROCESS_FALLBACK: &str = "Processing failed";

/// Everything a surgery pass needs. Paths are already resolved inside the
/// staging directory.
#[derive(Debug, Clone)]
pub struct SurgeryRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub output_name: String,
    pub options: SurgeryOptions,
}

#[derive(Debug, Clone)]
pub struct SurgeryOutcome {
    pub output_name: String,
    pub output_path: PathBuf,
    pub job: JobOutput,
}

/// Spawns processor runs. Jobs are not serialized: concurrent requests run
/// concurrently and their events interleave on the shared hub.
pub struct JobRunner {
    next_id: AtomicU64,
    processor: Arc<dyn Processor>,
    hub: Arc<BroadcastHub>,
    timeout: Option<Duration>,
}

impl JobRunner {
    pub fn new(processor: Arc<dyn Processor>, hub: Arc<BroadcastHub>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            processor,
            hub,
            timeout: None,
        }
    }

    /// Kill jobs that run longer than `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Dump font metadata for `input` and return the processor's stdout.
    pub async fn analyze(&self, input: &Path) -> Result<String, JobError> {
        ensure_input(input).await?;

        self.hub
            .broadcast(&ProgressEvent::progress("Analyzing font information...", 20));

        match self.run(JobMode::Analyze, args::analyze_args(input)).await {
            Ok(output) if output.succeeded() => {
                self.hub
                    .broadcast(&ProgressEvent::progress("Analysis complete!", 100));
                Ok(output.stdout)
            }
            Ok(output) => {
                let message = output.failure_message(ANALYZE_FALLBACK);
                let event = if output.stderr.trim().is_empty() {
                    ProgressEvent::error(ANALYZE_FALLBACK)
                } else {
                    ProgressEvent::error(format!("{ANALYZE_FALLBACK}: {message}"))
                };
                self.hub.broadcast(&event);
                Err(JobError::Failed {
                    exit_code: output.exit_code,
                    message,
                })
            }
            Err(e) => {
                self.hub.broadcast(&failure_event("Analysis", &e));
                Err(e)
            }
        }
    }

    /// Run the surgery pass described by `request`.
    pub async fn surgery(&self, request: SurgeryRequest) -> Result<SurgeryOutcome, JobError> {
        ensure_input(&request.input).await?;

        let options = &request.options;
        let job_args = args::surgery_args(options, &request.output, &request.input);

        // Option notices precede the start notice.
        if options.remove_embed {
            self.hub
                .broadcast(&ProgressEvent::progress("Removing font embeddings...", 30));
        }
        if !options.font_mappings.is_empty() {
            self.hub
                .broadcast(&ProgressEvent::progress("Applying font mappings...", 50));
        }
        if !options.font_cleanup.is_empty() {
            self.hub
                .broadcast(&ProgressEvent::progress("Cleaning up fonts...", 60));
        }
        self.hub
            .broadcast(&ProgressEvent::progress("Starting font surgery...", 10));

        let mode = JobMode::Process {
            verbose: options.verbose,
        };
        match self.run(mode, job_args).await {
            Ok(output) if output.succeeded() => {
                self.hub
                    .broadcast(&ProgressEvent::progress("Surgery complete!", 100));
                Ok(SurgeryOutcome {
                    output_name: request.output_name,
                    output_path: request.output,
                    job: output,
                })
            }
            Ok(output) => {
                let message = output.failure_message(PROCESS_FALLBACK);
                self.hub
                    .broadcast(&ProgressEvent::error(format!("Surgery failed: {message}")));
                Err(JobError::Failed {
                    exit_code: output.exit_code,
                    message,
                })
            }
            Err(e) => {
                self.hub.broadcast(&failure_event("Surgery", &e));
                Err(e)
            }
        }
    }

    /// Run the processor once with a fixed argument vector.
    ///
    /// Resolves with the exit code and collected output whether or not the
    /// processor succeeded; errors are reserved for spawn failures and the
    /// deadline.
    pub async fn run(&self, mode: JobMode, job_args: Vec<String>) -> Result<JobOutput, JobError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let span = tracing::info_span!("job", job_id = id, mode = %mode);
        self.execute(Job::new(id, mode, job_args))
            .instrument(span)
            .await
    }

    async fn execute(&self, mut job: Job) -> Result<JobOutput, JobError> {
        let cancel = CancellationToken::new();
        // Dropping the request future kills the processor too.
        let _cancel_on_drop = cancel.clone().drop_guard();

        let mut invocation = self.processor.invoke(job.args(), cancel.clone())?;
        job.set_running();
        tracing::info!(args = ?job.args(), "Processor started");

        let deadline = self.timeout.map(|limit| (Instant::now() + limit, limit));

        let outcome = loop {
            let next = match deadline {
                Some((at, limit)) => {
                    match tokio::time::timeout_at(at, invocation.next()).await {
                        Ok(event) => event,
                        Err(_) => {
                            cancel.cancel();
                            job.fail(&format!("Timed out after {}s", limit.as_secs()));
                            tracing::warn!(
                                timeout_secs = limit.as_secs(),
                                "Processor exceeded its deadline and was killed"
                            );
                            return Err(JobError::TimedOut { after: limit });
                        }
                    }
                }
                None => invocation.next().await,
            };

            match next {
                Some(ProcessorEvent::Stdout(chunk)) => {
                    self.stream_stdout(job.mode(), &chunk);
                    job.push_stdout(&chunk);
                }
                Some(ProcessorEvent::Stderr(chunk)) => {
                    self.stream_stderr(job.mode(), &chunk);
                    job.push_stderr(&chunk);
                }
                Some(ProcessorEvent::Exited(outcome)) => break outcome,
                None => {
                    tracing::warn!("Processor went away without an exit status");
                    break ExitOutcome::Signalled;
                }
            }
        };

        job.finish(outcome);
        tracing::info!(
            status = job.status().as_str(),
            exit_code = ?outcome.code(),
            stdout_bytes = job.stdout().len(),
            stderr_bytes = job.stderr().len(),
            "Processor finished"
        );
        Ok(job.into_output())
    }

    fn stream_stdout(&self, mode: JobMode, chunk: &str) {
        match mode {
            JobMode::Analyze => {}
            JobMode::Process { verbose: true } => {
                self.hub
                    .broadcast(&ProgressEvent::verbose(chunk.trim(), STREAM_PERCENT));
            }
            JobMode::Process { verbose: false } => {
                self.hub
                    .broadcast(&ProgressEvent::progress("Processing...", STREAM_PERCENT));
            }
        }
    }

    fn stream_stderr(&self, mode: JobMode, chunk: &str) {
        if let JobMode::Process { verbose: true } = mode {
            self.hub.broadcast(&ProgressEvent::verbose(
                format!("ERROR: {}", chunk.trim()),
                STREAM_PERCENT,
            ));
        }
    }
}

async fn ensure_input(input: &Path) -> Result<(), JobError> {
    match tokio::fs::metadata(input).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(JobError::InputNotFound {
            path: input.to_path_buf(),
        }),
    }
}

fn failure_event(label: &str, err: &JobError) -> ProgressEvent {
    match err {
        JobError::TimedOut { after } => {
            ProgressEvent::error(format!("{label} timed out after {}s", after.as_secs()))
        }
        other => ProgressEvent::error(format!("{label} failed: {other}")),
    }
}
