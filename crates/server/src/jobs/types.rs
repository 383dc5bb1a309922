// crates/server/src/jobs/types.rs
//! Types for the surgeon job system.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::processor::ProcessorError;

/// Process-local job identifier. Only used for logging; never sent to clients.
pub type JobId = u64;

/// What the processor is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    /// Dump font metadata. Output is collected, not streamed.
    Analyze,
    /// Run the surgery pass. `verbose` selects how output is streamed.
    Process { verbose: bool },
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobMode::Analyze => f.write_str("analyze"),
            JobMode::Process { verbose: false } => f.write_str("process"),
            JobMode::Process { verbose: true } => f.write_str("process-verbose"),
        }
    }
}

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

/// What a finished processor run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub job_id: JobId,
    /// `None` when the processor was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl JobOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Trimmed stderr, or `fallback` when stderr is blank. Never empty as
    /// long as `fallback` isn't.
    pub fn failure_message(&self, fallback: &str) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            fallback.to_string()
        } else {
            stderr.to_string()
        }
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Failed to start processor: {0}")]
    Spawn(#[from] ProcessorError),

    #[error("{message}")]
    Failed {
        exit_code: Option<i32>,
        message: String,
    },

    #[error("Job timed out after {}s", after.as_secs())]
    TimedOut { after: Duration },
}
