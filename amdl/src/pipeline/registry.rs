//! In-memory task registry: the single owner of job state.
//!
//! All mutations go through a `parking_lot::RwLock`. The lock is never held
//! across an `.await`; dispatch uses `try_send` so it can run under the lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cancel::CancelCheck;
use super::job::{Job, JobLogEntry, JobOptions, JobStatus};
use super::progress::ProgressSink;
use crate::{Error, Result};

/// Queue message telling a worker to pick up a job.
///
/// The generation changes on every manual retry so tickets issued for an
/// earlier run are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTicket {
    pub job_id: String,
    pub generation: u64,
}

/// A job a worker has claimed.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: String,
    pub options: JobOptions,
    pub cancel: CancelCheck,
    pub generation: u64,
}

/// Job counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

struct JobRecord {
    job: Job,
    cancel: CancellationToken,
    generation: u64,
}

pub struct TaskRegistry {
    jobs: RwLock<HashMap<String, JobRecord>>,
    queue: mpsc::Sender<DispatchTicket>,
    log_capacity: usize,
}

impl TaskRegistry {
    /// Create a registry and the receiving end of its dispatch queue.
    pub fn new(
        queue_capacity: usize,
        log_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<DispatchTicket>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let registry = Arc::new(Self {
            jobs: RwLock::new(HashMap::new()),
            queue: tx,
            log_capacity,
        });
        (registry, rx)
    }

    /// Register a job and enqueue it. Nothing is registered when the queue is full.
    pub fn create(&self, options: JobOptions) -> Result<String> {
        if options.url.trim().is_empty() {
            return Err(Error::validation("url must not be empty"));
        }

        let id = Uuid::new_v4().to_string();
        let job = Job::new(id.clone(), options, self.log_capacity);

        let mut jobs = self.jobs.write();
        self.dispatch(&id, 0)?;
        jobs.insert(
            id.clone(),
            JobRecord {
                job,
                cancel: CancellationToken::new(),
                generation: 0,
            },
        );
        drop(jobs);

        info!(job_id = %id, "Job queued");
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().get(id).map(|r| r.job.clone())
    }

    /// All jobs ordered by creation time, then id.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().values().map(|r| r.job.clone()).collect();
        jobs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        jobs
    }

    /// Request cancellation.
    ///
    /// A queued job fails immediately and is never dispatched. A running job
    /// is signalled and stops at its next checkpoint. Finished jobs only
    /// record the flag.
    pub fn cancel(&self, id: &str) -> Result<()> {
        let mut jobs = self.jobs.write();
        let record = jobs.get_mut(id).ok_or_else(|| Error::not_found("Job", id))?;

        record.job.canceled = true;
        record.cancel.cancel();
        match record.job.status {
            JobStatus::Queued => {
                record.job.status = JobStatus::Failed;
                record.job.log(JobLogEntry::info("canceled"));
                info!(job_id = %id, "Queued job canceled");
            }
            JobStatus::Running => {
                record.job.log(JobLogEntry::warn("cancel requested"));
                record.job.message = "canceling".to_string();
                info!(job_id = %id, "Cancellation requested for running job");
            }
            JobStatus::Succeeded | JobStatus::Failed => {
                record.job.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    /// Remove a job that is not running.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut jobs = self.jobs.write();
        let record = jobs.get(id).ok_or_else(|| Error::not_found("Job", id))?;
        if record.job.status == JobStatus::Running {
            return Err(Error::conflict(JobStatus::Running.as_str(), "deleted"));
        }
        if let Some(record) = jobs.remove(id) {
            // A pending ticket for this job becomes a no-op.
            record.cancel.cancel();
        }
        debug!(job_id = %id, "Job deleted");
        Ok(())
    }

    /// Reset a job that is not running and enqueue it again.
    pub fn retry(&self, id: &str) -> Result<()> {
        let mut jobs = self.jobs.write();
        let record = jobs.get_mut(id).ok_or_else(|| Error::not_found("Job", id))?;
        if record.job.status == JobStatus::Running {
            return Err(Error::conflict(JobStatus::Running.as_str(), "queued"));
        }

        let generation = record.generation + 1;
        self.dispatch(id, generation)?;

        record.generation = generation;
        record.cancel.cancel();
        record.cancel = CancellationToken::new();
        record.job.reset_for_retry();
        info!(job_id = %id, generation, "Job requeued");
        Ok(())
    }

    /// Drop every succeeded or failed job. Returns how many were removed.
    pub fn clear_completed(&self) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, r| !r.job.status.is_terminal());
        let removed = before - jobs.len();
        if removed > 0 {
            info!(count = removed, "Cleared completed jobs");
        }
        removed
    }

    pub fn any_running(&self) -> bool {
        self.jobs
            .read()
            .values()
            .any(|r| r.job.status == JobStatus::Running)
    }

    pub fn stats(&self) -> JobStats {
        let jobs = self.jobs.read();
        let mut stats = JobStats {
            total: jobs.len(),
            ..Default::default()
        };
        for record in jobs.values() {
            match record.job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Succeeded => stats.succeeded += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Claim a ticket for execution.
    ///
    /// Returns `None` when the job is gone, the ticket is stale, or the job is
    /// no longer queued (for example canceled while waiting).
    pub fn begin(&self, ticket: &DispatchTicket) -> Option<ClaimedJob> {
        let mut jobs = self.jobs.write();
        let record = jobs.get_mut(&ticket.job_id)?;
        if record.generation != ticket.generation
            || record.job.status != JobStatus::Queued
            || record.job.canceled
        {
            debug!(job_id = %ticket.job_id, generation = ticket.generation, "Dropping stale ticket");
            return None;
        }

        record.job.status = JobStatus::Running;
        record.job.log(JobLogEntry::info("started"));
        Some(ClaimedJob {
            id: ticket.job_id.clone(),
            options: record.job.options.clone(),
            cancel: CancelCheck::new(record.cancel.clone()),
            generation: record.generation,
        })
    }

    /// Record the outcome of a run started with [`begin`](Self::begin).
    pub fn finish(&self, id: &str, generation: u64, outcome: &Result<()>) {
        let mut jobs = self.jobs.write();
        let Some(record) = jobs.get_mut(id) else {
            return;
        };
        if record.generation != generation || record.job.status != JobStatus::Running {
            warn!(job_id = %id, generation, "Ignoring outcome of a stale run");
            return;
        }

        let job = &mut record.job;
        match outcome {
            _ if job.canceled => {
                job.status = JobStatus::Failed;
                job.log(JobLogEntry::info("canceled"));
            }
            Err(Error::Canceled) => {
                job.status = JobStatus::Failed;
                job.log(JobLogEntry::info("canceled"));
            }
            Ok(()) => {
                job.status = JobStatus::Succeeded;
                job.progress = 100;
                job.log(JobLogEntry::info("done"));
            }
            Err(e) => {
                job.status = JobStatus::Failed;
                job.log(JobLogEntry::error(e.to_string()));
            }
        }
        info!(job_id = %id, status = %job.status, "Job finished");
    }

    fn dispatch(&self, id: &str, generation: u64) -> Result<()> {
        let ticket = DispatchTicket {
            job_id: id.to_string(),
            generation,
        };
        self.queue.try_send(ticket).map_err(|e| match e {
            TrySendError::Full(_) => {
                warn!(job_id = %id, "Dispatch queue is full");
                Error::QueueFull
            }
            TrySendError::Closed(_) => Error::Other("dispatch queue is closed".to_string()),
        })
    }

    fn with_job(&self, id: &str, f: impl FnOnce(&mut Job)) {
        if let Some(record) = self.jobs.write().get_mut(id) {
            f(&mut record.job);
        }
    }
}

impl ProgressSink for TaskRegistry {
    fn append_log(&self, job_id: &str, entry: JobLogEntry) {
        self.with_job(job_id, |job| job.log(entry));
    }

    fn set_progress(&self, job_id: &str, done: u32, total: u32, message: &str) {
        self.with_job(job_id, |job| {
            let total = total.max(1);
            let done = done.min(total);
            job.total_units = total;
            job.done_units = done;
            job.progress = (u64::from(done) * 100 / u64::from(total)).min(100) as u8;
            job.log(JobLogEntry::info(message));
        });
    }

    fn set_sub_progress(&self, job_id: &str, percent: i32, message: Option<&str>) {
        self.with_job(job_id, |job| {
            job.sub_percent = percent.clamp(0, 100) as u8;
            if let Some(message) = message.filter(|m| !m.is_empty()) {
                job.sub_message = Some(message.to_string());
            }
            job.updated_at = Utc::now();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifest::QualityTier;

    fn options(url: &str) -> JobOptions {
        JobOptions::new(url, QualityTier::Alac).with_max_retries(1)
    }

    fn started(registry: &TaskRegistry, rx: &mut mpsc::Receiver<DispatchTicket>) -> ClaimedJob {
        let ticket = rx.try_recv().unwrap();
        registry.begin(&ticket).unwrap()
    }

    #[test]
    fn test_create_enqueues_ticket() {
        let (registry, mut rx) = TaskRegistry::new(4, 100);
        let id = registry.create(options("https://a")).unwrap();

        let ticket = rx.try_recv().unwrap();
        assert_eq!(ticket.job_id, id);
        assert_eq!(ticket.generation, 0);

        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.logs.last().unwrap().message, "queued");
    }

    #[test]
    fn test_create_rejects_empty_url() {
        let (registry, _rx) = TaskRegistry::new(4, 100);
        assert!(matches!(
            registry.create(options("  ")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_queue_full_leaves_no_job() {
        let (registry, _rx) = TaskRegistry::new(1, 100);
        registry.create(options("https://a")).unwrap();
        assert!(matches!(
            registry.create(options("https://b")),
            Err(Error::QueueFull)
        ));
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn test_list_ordered_by_creation() {
        let (registry, _rx) = TaskRegistry::new(8, 100);
        let mut ids: Vec<_> = (0..4)
            .map(|i| registry.create(options(&format!("https://{i}"))).unwrap())
            .collect();

        let jobs = registry.list();
        assert!(jobs.windows(2).all(|w| {
            (w[0].created_at, &w[0].id) <= (w[1].created_at, &w[1].id)
        }));
        let mut listed: Vec<_> = jobs.into_iter().map(|j| j.id).collect();
        listed.sort();
        ids.sort();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_cancel_queued_job_fails_it_and_drops_ticket() {
        let (registry, mut rx) = TaskRegistry::new(4, 100);
        let id = registry.create(options("https://a")).unwrap();
        registry.cancel(&id).unwrap();

        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.message, "canceled");
        assert!(job.canceled);

        let ticket = rx.try_recv().unwrap();
        assert!(registry.begin(&ticket).is_none());
    }

    #[test]
    fn test_cancel_running_job_signals_token() {
        let (registry, mut rx) = TaskRegistry::new(4, 100);
        let id = registry.create(options("https://a")).unwrap();
        let claimed = started(&registry, &mut rx);

        registry.cancel(&id).unwrap();
        assert!(claimed.cancel.is_canceled());
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.message, "canceling");
        assert_eq!(job.logs.last().unwrap().message, "cancel requested");

        registry.finish(&id, claimed.generation, &Err(Error::Canceled));
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.message, "canceled");
    }

    #[test]
    fn test_cancel_missing_job() {
        let (registry, _rx) = TaskRegistry::new(4, 100);
        assert!(matches!(
            registry.cancel("nope"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_running_is_conflict() {
        let (registry, mut rx) = TaskRegistry::new(4, 100);
        let id = registry.create(options("https://a")).unwrap();
        let claimed = started(&registry, &mut rx);

        assert!(matches!(
            registry.delete(&id),
            Err(Error::InvalidStateTransition { .. })
        ));
        registry.finish(&id, claimed.generation, &Ok(()));
        registry.delete(&id).unwrap();
        assert!(registry.get(&id).is_none());
        assert!(matches!(registry.delete(&id), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_finish_outcomes() {
        let (registry, mut rx) = TaskRegistry::new(4, 100);
        let ok = registry.create(options("https://a")).unwrap();
        let bad = registry.create(options("https://b")).unwrap();
        let first = started(&registry, &mut rx);
        let second = started(&registry, &mut rx);
        assert_eq!(first.id, ok);

        registry.finish(&ok, first.generation, &Ok(()));
        registry.finish(&bad, second.generation, &Err(Error::tool("exit status 1")));

        let job = registry.get(&ok).unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.message, "done");
        assert_eq!(job.progress, 100);

        let job = registry.get(&bad).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.message, "tool error: exit status 1");
    }

    #[test]
    fn test_retry_bumps_generation_and_resets() {
        let (registry, mut rx) = TaskRegistry::new(4, 100);
        let id = registry.create(options("https://a")).unwrap();
        let claimed = started(&registry, &mut rx);
        assert!(matches!(
            registry.retry(&id),
            Err(Error::InvalidStateTransition { .. })
        ));
        registry.set_progress(&id, 1, 2, "half");
        registry.finish(&id, claimed.generation, &Err(Error::tool("boom")));

        registry.retry(&id).unwrap();
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert_eq!(job.message, "manual retry");
        assert_eq!(job.logs.len(), 1);

        let ticket = rx.try_recv().unwrap();
        assert_eq!(ticket.generation, 1);
        let claimed = registry.begin(&ticket).unwrap();
        assert!(!claimed.cancel.is_canceled());
    }

    #[test]
    fn test_retry_of_queued_job_makes_old_ticket_stale() {
        let (registry, mut rx) = TaskRegistry::new(4, 100);
        let id = registry.create(options("https://a")).unwrap();
        registry.retry(&id).unwrap();

        let old = rx.try_recv().unwrap();
        let new = rx.try_recv().unwrap();
        assert!(registry.begin(&old).is_none());
        assert!(registry.begin(&new).is_some());
        assert!(registry.begin(&new).is_none());
    }

    #[test]
    fn test_retry_when_queue_full_changes_nothing() {
        let (registry, mut rx) = TaskRegistry::new(1, 100);
        let id = registry.create(options("https://a")).unwrap();
        let claimed = started(&registry, &mut rx);
        registry.finish(&id, claimed.generation, &Err(Error::tool("boom")));
        registry.create(options("https://b")).unwrap();

        assert!(matches!(registry.retry(&id), Err(Error::QueueFull)));
        assert_eq!(registry.get(&id).unwrap().status, JobStatus::Failed);
    }

    #[test]
    fn test_clear_completed_keeps_active() {
        let (registry, mut rx) = TaskRegistry::new(4, 100);
        let done = registry.create(options("https://a")).unwrap();
        let waiting = registry.create(options("https://b")).unwrap();
        let claimed = started(&registry, &mut rx);
        registry.finish(&done, claimed.generation, &Ok(()));

        assert_eq!(registry.clear_completed(), 1);
        assert!(registry.get(&done).is_none());
        assert!(registry.get(&waiting).is_some());
    }

    #[test]
    fn test_progress_math_and_clamping() {
        let (registry, _rx) = TaskRegistry::new(4, 100);
        let id = registry.create(options("https://a")).unwrap();

        registry.set_progress(&id, 1, 3, "done track 1/3");
        let job = registry.get(&id).unwrap();
        assert_eq!((job.done_units, job.total_units, job.progress), (1, 3, 33));
        assert_eq!(job.message, "done track 1/3");

        registry.set_progress(&id, 5, 0, "odd");
        let job = registry.get(&id).unwrap();
        assert_eq!((job.done_units, job.total_units, job.progress), (1, 1, 100));

        registry.set_sub_progress(&id, 140, Some("track"));
        registry.set_sub_progress(&id, -5, Some(""));
        let job = registry.get(&id).unwrap();
        assert_eq!(job.sub_percent, 0);
        assert_eq!(job.sub_message.as_deref(), Some("track"));
    }

    #[test]
    fn test_log_is_capped() {
        let (registry, _rx) = TaskRegistry::new(4, 5);
        let id = registry.create(options("https://a")).unwrap();
        for i in 0..20 {
            registry.append_log(&id, JobLogEntry::info(format!("line {i}")));
        }
        let job = registry.get(&id).unwrap();
        assert_eq!(job.logs.len(), 5);
        assert_eq!(job.logs.iter().next().unwrap().message, "line 15");
    }

    #[test]
    fn test_stats() {
        let (registry, mut rx) = TaskRegistry::new(4, 100);
        registry.create(options("https://a")).unwrap();
        registry.create(options("https://b")).unwrap();
        started(&registry, &mut rx);
        let stats = registry.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.queued, 1);
        assert!(registry.any_running());
    }
}
