//! Catalog metadata used by the web UI to pick tracks and albums.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{AlbumMetaResponse, AlbumTrackItem, ArtistAlbumsResponse, UrlQuery};
use crate::api::server::AppState;
use crate::catalog::CatalogUrl;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/album", get(album_meta))
        .route("/artist", get(artist_albums))
}

fn required_url(query: &UrlQuery) -> ApiResult<&str> {
    query
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("url required"))
}

/// `GET /meta/album?url=`: the album's track list with 1-based indices.
async fn album_meta(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Json<AlbumMetaResponse>> {
    let url = required_url(&query)?;
    let Ok(CatalogUrl::Album { storefront, id, .. }) = CatalogUrl::parse(url) else {
        return Err(ApiError::bad_request("invalid album url"));
    };

    let album = state
        .catalog
        .album(&storefront, &id)
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let tracks = album
        .tracks
        .iter()
        .enumerate()
        .map(|(i, track)| AlbumTrackItem {
            index: i + 1,
            id: track.id.clone(),
            name: track.name.clone(),
        })
        .collect();

    Ok(Json(AlbumMetaResponse {
        title: album.name,
        artist: album.artist_name,
        cover: album.artwork_url.unwrap_or_default(),
        tracks,
    }))
}

/// `GET /meta/artist?url=`: the artist's albums, oldest first.
async fn artist_albums(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Json<ArtistAlbumsResponse>> {
    let url = required_url(&query)?;
    let Ok(CatalogUrl::Artist { storefront, id }) = CatalogUrl::parse(url) else {
        return Err(ApiError::bad_request("invalid artist url"));
    };

    let albums = state
        .catalog
        .artist_albums(&storefront, &id)
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(ArtistAlbumsResponse { albums }))
}
