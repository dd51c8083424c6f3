use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::cancel::CancelCheck;
use super::progress::ProgressReporter;
use crate::{Error, Result};

/// Runs a job body up to `max_retries + 1` times with a fixed, interruptible delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryController {
    delay: Duration,
}

impl RetryController {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error,
    /// the job is canceled, or attempts run out. Returns the last error.
    pub async fn run<F, Fut>(
        &self,
        max_retries: u32,
        cancel: &CancelCheck,
        progress: &ProgressReporter,
        mut attempt: F,
    ) -> Result<()>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut last_error = None;

        for n in 0..=max_retries {
            if cancel.is_canceled() {
                progress.info("canceled");
                return Err(Error::Canceled);
            }

            if n > 0 {
                progress.info(format!("retry {n}..."));
                tokio::select! {
                    _ = cancel.cancelled() => {
                        progress.info("canceled");
                        return Err(Error::Canceled);
                    }
                    _ = tokio::time::sleep(self.delay) => {}
                }
            }

            match attempt(n).await {
                Ok(()) => return Ok(()),
                Err(Error::Canceled) => return Err(Error::Canceled),
                Err(e) => {
                    progress.error(format!("error: {e}"));
                    if !e.is_retryable() {
                        debug!(job_id = %progress.job_id(), error = %e, "Error is not retryable");
                        return Err(e);
                    }
                    warn!(job_id = %progress.job_id(), attempt = n, error = %e, "Attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Other("no attempt was made".to_string())))
    }
}
