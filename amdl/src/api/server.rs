//! API server setup and configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::routes;
use crate::catalog::CatalogClient;
use crate::config::{EngineConfig, ServerConfig, StorageConfig};
use crate::error::{Error, Result};
use crate::pipeline::TaskRegistry;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Request body size limit in bytes
    pub body_limit: usize,
    /// Static web UI served at `/`
    pub web_dir: Option<PathBuf>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        ServerConfig::default().into()
    }
}

impl From<ServerConfig> for ApiServerConfig {
    fn from(config: ServerConfig) -> Self {
        Self {
            bind_address: config.bind_address,
            port: config.port,
            enable_cors: config.enable_cors,
            body_limit: config.body_limit,
            web_dir: config.web_dir,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Job registry
    pub registry: Arc<TaskRegistry>,
    /// Catalog used by the metadata and search routes
    pub catalog: Arc<dyn CatalogClient>,
    /// Download layout, needed by the cleanup route
    pub storage: Arc<StorageConfig>,
    /// Retries applied when a submission does not set any
    pub default_max_retries: u32,
    /// Cadence of the per-job event stream
    pub stream_interval: Duration,
    /// Base directory the download folders are resolved against
    pub base_dir: PathBuf,
    /// Fires when the server shuts down; long-lived responses end on it
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(registry: Arc<TaskRegistry>, catalog: Arc<dyn CatalogClient>) -> Self {
        let engine = EngineConfig::default();
        Self {
            start_time: Instant::now(),
            registry,
            catalog,
            storage: Arc::new(StorageConfig::default()),
            default_max_retries: engine.default_max_retries,
            stream_interval: engine.stream_interval(),
            base_dir: PathBuf::from("."),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = Arc::new(storage);
        self
    }

    pub fn with_engine(mut self, engine: &EngineConfig) -> Self {
        self.default_max_retries = engine.default_max_retries;
        self.stream_interval = engine.stream_interval();
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }
}

fn is_quiet_path(path: &str) -> bool {
    path.starts_with("/health")
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, mut state: AppState) -> Self {
        let cancel_token = CancellationToken::new();
        state.shutdown = cancel_token.clone();
        Self {
            config,
            state,
            cancel_token,
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        let mut router = routes::create_router(self.state.clone())
            .layer(DefaultBodyLimit::max(self.config.body_limit));

        if let Some(web_dir) = self.config.web_dir.as_ref().filter(|d| d.is_dir()) {
            let index = ServeFile::new(web_dir.join("index.html"));
            router = router
                .nest_service("/static", ServeDir::new(web_dir))
                .route_service("/", index);
        }

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        router.layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    if is_quiet_path(req.uri().path()) {
                        Span::none()
                    } else {
                        let mut make_span =
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                        use tower_http::trace::MakeSpan;
                        make_span.make_span(req)
                    }
                })
                .on_request(|req: &Request, span: &Span| {
                    if span.is_disabled() || is_quiet_path(req.uri().path()) {
                        return;
                    }
                    let mut on_request =
                        tower_http::trace::DefaultOnRequest::new().level(tracing::Level::INFO);
                    use tower_http::trace::OnRequest;
                    on_request.on_request(req, span);
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let on_response =
                            tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO);
                        use tower_http::trace::OnResponse;
                        on_response.on_response(res, latency, span);
                    },
                ),
        )
    }

    /// Start the server. Returns once the cancel token fires.
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| Error::config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("API server listening on http://{}", addr);

        let cancel_token = self.cancel_token.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await
            .map_err(|e| Error::Other(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
