use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use amdl::api::{ApiServer, ApiServerConfig, AppState};
use amdl::catalog::{CatalogClient, HttpCatalogClient};
use amdl::config;
use amdl::downloader::{ExternalTool, ManifestResolver, ProcessTool, StreamResolver};
use amdl::logging::{init_logging, start_retention_cleanup};
use amdl::pipeline::{PipelineManager, PipelineSettings};
use amdl::utils::http_client::build_client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cfg = config::load_or_init().context("failed to load configuration")?;
    let _log_guard = init_logging(&cfg.logging.log_dir).context("failed to initialize logging")?;

    if cfg.catalog.bearer_token().is_empty() {
        anyhow::bail!("authorization token is not configured (set AUTHORIZATION_TOKEN or catalog.authorization_token)");
    }
    if !cfg.catalog.has_media_user_token() {
        info!("media-user-token not set: music videos and the lossy fallback are disabled");
    }

    let client = build_client(cfg.catalog.timeout()).context("failed to build HTTP client")?;
    let catalog: Arc<dyn CatalogClient> = Arc::new(
        HttpCatalogClient::new(client.clone(), cfg.catalog.clone())
            .with_artwork(cfg.storage.cover_size.clone(), cfg.storage.cover_format.clone()),
    );
    let resolver: Arc<dyn StreamResolver> = Arc::new(ManifestResolver::new(client, cfg.ceilings));
    let tool: Arc<dyn ExternalTool> = Arc::new(ProcessTool::new(cfg.tools.clone(), &cfg.catalog));

    let manager = PipelineManager::new(cfg.engine.clone());
    let runner = manager.stage_pipeline(
        catalog.clone(),
        resolver,
        tool,
        PipelineSettings::from_config(&cfg),
    );
    manager.start(Arc::new(runner));

    let shutdown = CancellationToken::new();
    start_retention_cleanup(cfg.logging.log_dir.clone(), shutdown.clone());

    let state = AppState::new(manager.registry(), catalog)
        .with_storage(cfg.storage.clone())
        .with_engine(&cfg.engine);
    let server = ApiServer::new(ApiServerConfig::from(cfg.server.clone()), state);

    let server_token = server.cancel_token();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
        server_token.cancel();
    });

    let result = server.run().await;
    shutdown.cancel();
    manager.stop().await;
    result.context("API server failed")?;

    info!("amdl stopped");
    Ok(())
}
