// crates/server/src/jobs/mod.rs
//! Surgeon jobs: one external processor run per analyze/process request.
//!
//! Provides:
//! - `JobRunner`: spawns the processor, streams its output to the broadcast hub
//! - `Job`: lifecycle state of a single run
//! - `Processor`: pluggable capability that actually runs the surgeon
//! - `args`: argument vector construction

pub mod args;
pub mod processor;
pub mod runner;
pub mod state;
pub mod types;

pub use processor::{
    CommandProcessor, ExitOutcome, Invocation, Processor, ProcessorError, ProcessorEvent,
};
pub use runner::{JobRunner, SurgeryOutcome, SurgeryRequest};
pub use state::Job;
pub use types::{JobError, JobId, JobMode, JobOutput, JobStatus};
