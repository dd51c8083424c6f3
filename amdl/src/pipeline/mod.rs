//! Job engine: the in-memory task registry, the worker pool that drains its
//! dispatch queue, and the stage pipeline each job runs through.
//!
//! - [`TaskRegistry`] owns every job record and serializes state transitions
//! - [`WorkerPool`] runs a fixed number of workers over one bounded queue
//! - [`StagePipeline`] downloads the items of one job under [`RetryController`]

mod cancel;
mod job;
mod log_buffer;
mod manager;
mod progress;
mod registry;
mod retry;
mod stages;
mod worker_pool;

pub use cancel::CancelCheck;
pub use job::{Job, JobLogEntry, JobOptions, JobStatus, LogLevel};
pub use log_buffer::LogBuffer;
pub use manager::PipelineManager;
pub use progress::{ProgressReporter, ProgressSink};
pub use registry::{ClaimedJob, DispatchTicket, JobStats, TaskRegistry};
pub use retry::RetryController;
pub use stages::{PipelineSettings, StagePipeline};
pub use worker_pool::{JobRunner, WorkerPool};
