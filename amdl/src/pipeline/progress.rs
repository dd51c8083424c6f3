use std::sync::Arc;

use super::job::JobLogEntry;

/// Where a running job reports its progress. Implemented by the task registry.
pub trait ProgressSink: Send + Sync {
    fn append_log(&self, job_id: &str, entry: JobLogEntry);

    /// Coarse progress: `done` of `total` units, with a message that is also logged.
    fn set_progress(&self, job_id: &str, done: u32, total: u32, message: &str);

    /// Progress of the current item. `percent` is clamped to 0-100.
    fn set_sub_progress(&self, job_id: &str, percent: i32, message: Option<&str>);
}

struct NoopSink;

impl ProgressSink for NoopSink {
    fn append_log(&self, _job_id: &str, _entry: JobLogEntry) {}
    fn set_progress(&self, _job_id: &str, _done: u32, _total: u32, _message: &str) {}
    fn set_sub_progress(&self, _job_id: &str, _percent: i32, _message: Option<&str>) {}
}

/// Handle a job uses to report progress and log lines.
#[derive(Clone)]
pub struct ProgressReporter {
    job_id: String,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressReporter {
    pub fn new(job_id: impl Into<String>, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            job_id: job_id.into(),
            sink,
        }
    }

    pub fn noop(job_id: impl Into<String>) -> Self {
        Self::new(job_id, Arc::new(NoopSink))
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn info(&self, message: impl Into<String>) {
        self.sink
            .append_log(&self.job_id, JobLogEntry::info(message));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.sink
            .append_log(&self.job_id, JobLogEntry::warn(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.sink
            .append_log(&self.job_id, JobLogEntry::error(message));
    }

    pub fn progress(&self, done: u32, total: u32, message: &str) {
        self.sink.set_progress(&self.job_id, done, total, message);
    }

    pub fn sub(&self, percent: i32, message: Option<&str>) {
        self.sink.set_sub_progress(&self.job_id, percent, message);
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}
