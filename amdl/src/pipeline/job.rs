//! Job model shared by the registry, the workers and the API.

use chrono::{DateTime, Utc};
use manifest::QualityTier;
use serde::{Deserialize, Serialize};

use super::log_buffer::LogBuffer;

/// Job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker.
    Queued,
    /// Claimed by a worker.
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Succeeded and failed jobs never change again unless retried.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log level for job logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// A single job log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl JobLogEntry {
    /// Create a new log entry with the current timestamp.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }
}

/// What a job should acquire. Fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    pub url: String,
    pub quality: QualityTier,
    /// 1-based indices into the collection. Empty means every item.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracks: Vec<u32>,
    /// Only the track named by the URL's `?i=` parameter.
    #[serde(default)]
    pub song_only: bool,
    pub max_retries: u32,
}

impl JobOptions {
    pub fn new(url: impl Into<String>, quality: QualityTier) -> Self {
        Self {
            url: url.into(),
            quality,
            tracks: Vec::new(),
            song_only: false,
            max_retries: 0,
        }
    }

    pub fn with_tracks(mut self, tracks: Vec<u32>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn with_song_only(mut self, song_only: bool) -> Self {
        self.song_only = song_only;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Snapshot of a job as exposed over the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(flatten)]
    pub options: JobOptions,
    pub status: JobStatus,
    /// Coarse progress, 0-100.
    pub progress: u8,
    pub total_units: u32,
    pub done_units: u32,
    /// Progress of the current item, 0-100.
    pub sub_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_message: Option<String>,
    /// Last human-readable status line.
    pub message: String,
    pub logs: LogBuffer,
    pub canceled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub(crate) fn new(id: String, options: JobOptions, log_capacity: usize) -> Self {
        let now = Utc::now();
        let mut job = Self {
            id,
            options,
            status: JobStatus::Queued,
            progress: 0,
            total_units: 1,
            done_units: 0,
            sub_percent: 0,
            sub_message: None,
            message: String::new(),
            logs: LogBuffer::new(log_capacity),
            canceled: false,
            created_at: now,
            updated_at: now,
        };
        job.log(JobLogEntry::info("queued"));
        job
    }

    /// Append a log line. The line also becomes the job's message.
    pub(crate) fn log(&mut self, entry: JobLogEntry) {
        self.message = entry.message.clone();
        self.updated_at = entry.timestamp;
        self.logs.push(entry);
    }

    /// Reset progress and history for another run.
    pub(crate) fn reset_for_retry(&mut self) {
        self.status = JobStatus::Queued;
        self.progress = 0;
        self.total_units = 1;
        self.done_units = 0;
        self.sub_percent = 0;
        self.sub_message = None;
        self.canceled = false;
        self.logs.clear();
        self.log(JobLogEntry::info("manual retry"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_queued_with_seed_log() {
        let job = Job::new("a".into(), JobOptions::new("u", QualityTier::Aac), 10);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.message, "queued");
        assert_eq!(job.logs.len(), 1);
        assert_eq!(job.total_units, 1);
    }

    #[test]
    fn test_job_serializes_camel_case() {
        let job = Job::new(
            "a".into(),
            JobOptions::new("https://x", QualityTier::Atmos).with_max_retries(2),
            10,
        );
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "queued");
        assert_eq!(value["quality"], "atmos");
        assert_eq!(value["maxRetries"], 2);
        assert_eq!(value["totalUnits"], 1);
        assert_eq!(value["logs"][0]["message"], "queued");
        assert_eq!(value["logs"][0]["level"], "info");
        assert!(value.get("subMessage").is_none());
        assert!(value.get("tracks").is_none());
    }

    #[test]
    fn test_reset_for_retry() {
        let mut job = Job::new("a".into(), JobOptions::new("u", QualityTier::Alac), 10);
        job.status = JobStatus::Failed;
        job.progress = 50;
        job.done_units = 3;
        job.total_units = 6;
        job.canceled = true;
        job.log(JobLogEntry::error("boom"));

        job.reset_for_retry();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!((job.progress, job.done_units, job.total_units), (0, 0, 1));
        assert!(!job.canceled);
        assert_eq!(job.logs.len(), 1);
        assert_eq!(job.message, "manual retry");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }
}
