//! Fixed-size worker pool draining the registry's dispatch queue.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::registry::{ClaimedJob, DispatchTicket, TaskRegistry};
use crate::{Error, Result};

/// Executes a claimed job from start to finish.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: ClaimedJob) -> Result<()>;
}

pub struct WorkerPool {
    workers: usize,
    cancellation_token: CancellationToken,
    tasks: parking_lot::Mutex<Option<JoinSet<()>>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cancellation_token: CancellationToken::new(),
            tasks: parking_lot::Mutex::new(Some(JoinSet::new())),
        }
    }

    /// Spawn the workers. They share one receiver.
    pub fn start(
        &self,
        registry: Arc<TaskRegistry>,
        receiver: mpsc::Receiver<DispatchTicket>,
        runner: Arc<dyn JobRunner>,
    ) {
        info!("Starting worker pool with {} workers", self.workers);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut tasks = self.tasks.lock();
        let Some(join_set) = tasks.as_mut() else {
            return;
        };

        for i in 0..self.workers {
            let cancellation_token = self.cancellation_token.clone();
            let receiver = receiver.clone();
            let registry = registry.clone();
            let runner = runner.clone();

            join_set.spawn(async move {
                debug!("Worker {} started", i);

                loop {
                    let ticket = tokio::select! {
                        _ = cancellation_token.cancelled() => break,
                        ticket = async { receiver.lock().await.recv().await } => ticket,
                    };
                    let Some(ticket) = ticket else {
                        debug!("Dispatch queue closed, worker {} exiting", i);
                        break;
                    };

                    let Some(job) = registry.begin(&ticket) else {
                        continue;
                    };
                    let job_id = job.id.clone();
                    let generation = job.generation;
                    debug!(job_id = %job_id, worker = i, "Worker picked up job");

                    // A panicking job must not take the worker down with it.
                    let runner = runner.clone();
                    let outcome = match tokio::spawn(async move { runner.run(job).await }).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!(job_id = %job_id, error = %e, "Job task aborted");
                            Err(Error::Other(format!("job aborted: {e}")))
                        }
                    };

                    registry.finish(&job_id, generation, &outcome);
                }

                debug!("Worker {} shutting down", i);
            });
        }
    }

    /// Stop accepting work and wait for the workers to exit.
    ///
    /// A job in progress is allowed to finish its current step first.
    pub async fn stop(&self) {
        info!("Stopping worker pool");
        self.cancellation_token.cancel();

        let join_set = {
            let mut tasks = self.tasks.lock();
            tasks.take()
        };

        if let Some(mut join_set) = join_set {
            while join_set.join_next().await.is_some() {}
        }

        info!("Worker pool stopped");
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    pub fn is_running(&self) -> bool {
        !self.cancellation_token.is_cancelled()
    }
}
