//! Wires the registry, the worker pool and the stage pipeline together.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::job::JobStatus;
use super::registry::{DispatchTicket, TaskRegistry};
use super::retry::RetryController;
use super::stages::{PipelineSettings, StagePipeline};
use super::worker_pool::{JobRunner, WorkerPool};
use crate::catalog::CatalogClient;
use crate::config::EngineConfig;
use crate::downloader::{ExternalTool, StreamResolver};

pub struct PipelineManager {
    config: EngineConfig,
    registry: Arc<TaskRegistry>,
    pool: WorkerPool,
    /// Taken by [`PipelineManager::start`].
    receiver: parking_lot::Mutex<Option<mpsc::Receiver<DispatchTicket>>>,
}

impl PipelineManager {
    pub fn new(config: EngineConfig) -> Self {
        let (registry, receiver) = TaskRegistry::new(config.queue_capacity, config.log_capacity);
        Self {
            pool: WorkerPool::new(config.workers),
            config,
            registry,
            receiver: parking_lot::Mutex::new(Some(receiver)),
        }
    }

    pub fn registry(&self) -> Arc<TaskRegistry> {
        self.registry.clone()
    }

    /// Build the production runner reporting into this manager's registry.
    pub fn stage_pipeline(
        &self,
        catalog: Arc<dyn CatalogClient>,
        resolver: Arc<dyn StreamResolver>,
        tool: Arc<dyn ExternalTool>,
        settings: PipelineSettings,
    ) -> StagePipeline {
        StagePipeline::new(
            catalog,
            resolver,
            tool,
            settings,
            RetryController::new(self.config.retry_delay()),
            self.registry.clone(),
        )
    }

    /// Start the workers. Only the first call has an effect.
    pub fn start(&self, runner: Arc<dyn JobRunner>) {
        let Some(receiver) = self.receiver.lock().take() else {
            warn!("Pipeline manager already started");
            return;
        };
        info!(
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            "Starting pipeline manager"
        );
        self.pool.start(self.registry.clone(), receiver, runner);
    }

    /// Signal running jobs and wait for the workers to exit. Jobs stop at
    /// their next checkpoint; an external program already running is not killed.
    pub async fn stop(&self) {
        info!("Stopping pipeline manager");
        for job in self.registry.list() {
            if job.status == JobStatus::Running
                && let Err(e) = self.registry.cancel(&job.id)
            {
                warn!(job_id = %job.id, error = %e, "Failed to cancel job on shutdown");
            }
        }
        self.pool.stop().await;
        info!("Pipeline manager stopped");
    }
}
