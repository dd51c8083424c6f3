//! Catalog keyword search.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{SearchParams, SearchResponse};
use crate::api::server::AppState;
use crate::catalog::{SearchKind, SearchQuery};

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

/// `GET /search?q=&type=album|song|artist&limit=&offset=`
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let term = params.q.as_deref().map(str::trim).unwrap_or_default();
    let kind = params
        .kind
        .as_deref()
        .and_then(|k| k.parse::<SearchKind>().ok());
    let Some(kind) = kind.filter(|_| !term.is_empty()) else {
        return Err(ApiError::bad_request("q and type=album|song|artist required"));
    };

    let query = SearchQuery {
        term: term.to_string(),
        kind,
        limit: params.effective_limit(),
        offset: params.effective_offset(),
    };
    let items = state
        .catalog
        .search(&query)
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(SearchResponse { items }))
}
