//! Job orchestration: the per-job state machine and the worker pool that
//! drains the job queue.

pub mod job;
pub mod worker;

pub use job::{ArchiveJob, JobReport, JobState};
pub use worker::run_pipeline;
