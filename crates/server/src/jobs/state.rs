// crates/server/src/jobs/state.rs
//! Lifecycle state for a single surgeon job.

use super::processor::ExitOutcome;
use super::types::{JobId, JobMode, JobOutput, JobStatus};

/// One processor run. The argument vector is fixed at construction.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    mode: JobMode,
    args: Vec<String>,
    status: JobStatus,
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
}

impl Job {
    pub fn new(id: JobId, mode: JobMode, args: Vec<String>) -> Self {
        Self {
            id,
            mode,
            args,
            status: JobStatus::Pending,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
        }
    }

    pub fn mode(&self) -> JobMode {
        self.mode
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Transition the job to Running status.
    pub fn set_running(&mut self) {
        self.status = JobStatus::Running;
    }

    pub fn push_stdout(&mut self, chunk: &str) {
        self.stdout.push_str(chunk);
    }

    pub fn push_stderr(&mut self, chunk: &str) {
        self.stderr.push_str(chunk);
    }

    /// Record the exit outcome; status becomes Succeeded only on exit code 0.
    pub fn finish(&mut self, outcome: ExitOutcome) {
        self.exit_code = outcome.code();
        self.status = if outcome.success() {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed
        };
    }

    /// Mark the job as failed without an exit code (timeout, lost processor).
    pub fn fail(&mut self, reason: &str) {
        if !self.stderr.is_empty() && !self.stderr.ends_with('\n') {
            self.stderr.push('\n');
        }
        self.stderr.push_str(reason);
        self.status = JobStatus::Failed;
    }

    pub fn into_output(self) -> JobOutput {
        JobOutput {
            job_id: self.id,
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}
