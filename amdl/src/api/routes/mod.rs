//! API route modules.

pub mod health;
pub mod maintenance;
pub mod meta;
pub mod search;
pub mod tasks;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
///
/// The API is served both at the root and under `/v1`, where the web UI calls it.
pub fn create_router(state: AppState) -> Router {
    let api: Router<AppState> = Router::new()
        .nest("/tasks", tasks::router())
        .nest("/meta", meta::router())
        .merge(search::router())
        .merge(maintenance::router())
        .nest("/health", health::router());

    Router::new()
        .merge(api.clone())
        .nest("/v1", api)
        .with_state(state)
}
