use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::api_types::{Page, Resource, SearchResponse, WebPlaybackResponse};
use super::models::{
    AlbumSummary, Collection, CollectionKind, MusicVideo, SearchItem, SearchKind, SearchQuery,
};
use crate::config::CatalogConfig;
use crate::utils::fs;
use crate::{Error, Result};

const WEB_ORIGIN: &str = "https://music.apple.com";
const PAGE_LIMIT: u32 = 100;
/// Upper bound on followed `next` links for one collection.
const MAX_PAGES: usize = 100;

/// Read access to the music catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn album(&self, storefront: &str, id: &str) -> Result<Collection>;

    async fn playlist(&self, storefront: &str, id: &str) -> Result<Collection>;

    /// Id of the album a song belongs to.
    async fn song_album_id(&self, storefront: &str, song_id: &str) -> Result<String>;

    async fn music_video(&self, storefront: &str, id: &str) -> Result<MusicVideo>;

    /// Master playlist URL of a music video. Needs a media-user token.
    async fn music_video_manifest(&self, id: &str) -> Result<String>;

    /// Every album of an artist, oldest first.
    async fn artist_albums(&self, storefront: &str, artist_id: &str) -> Result<Vec<AlbumSummary>>;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchItem>>;

    /// Download artwork from a `{w}x{h}` URL template to `dest`.
    async fn download_artwork(&self, template: &str, dest: &Path) -> Result<()>;
}

/// [`CatalogClient`] backed by the catalog web API.
pub struct HttpCatalogClient {
    client: reqwest::Client,
    config: CatalogConfig,
    cover_size: String,
    cover_format: String,
}

impl HttpCatalogClient {
    pub fn new(client: reqwest::Client, config: CatalogConfig) -> Self {
        Self {
            client,
            config,
            cover_size: "5000x5000".to_string(),
            cover_format: "jpg".to_string(),
        }
    }

    pub fn with_artwork(mut self, size: impl Into<String>, format: impl Into<String>) -> Self {
        self.cover_size = size.into();
        self.cover_format = format.into();
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.config.bearer_token());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| Error::config(format!("invalid authorization token: {e}")))?,
        );
        headers.insert(ORIGIN, HeaderValue::from_static(WEB_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static(WEB_ORIGIN));
        if self.config.has_media_user_token() {
            let token = self.config.media_user_token.trim();
            headers.insert(
                "media-user-token",
                HeaderValue::from_str(token)
                    .map_err(|e| Error::config(format!("invalid media-user token: {e}")))?,
            );
        }
        Ok(headers)
    }

    fn catalog_url(&self, storefront: &str, path: &str) -> String {
        format!(
            "{}/v1/catalog/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            storefront,
            path.trim_start_matches('/')
        )
    }

    /// Resolve a `next` link, which the API returns relative to its root.
    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), href)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        debug!(url, "Catalog request");
        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }

    fn language_query(&self) -> Vec<(&'static str, String)> {
        if self.config.language.is_empty() {
            Vec::new()
        } else {
            vec![("l", self.config.language.clone())]
        }
    }

    async fn collection(
        &self,
        kind: CollectionKind,
        storefront: &str,
        id: &str,
    ) -> Result<Collection> {
        let path = match kind {
            CollectionKind::Album => format!("albums/{id}"),
            CollectionKind::Playlist => format!("playlists/{id}"),
        };
        let mut query = self.language_query();
        query.push(("include", "tracks,artists".to_string()));
        query.push(("extend", "extendedAssetUrls".to_string()));

        let page: Page = self
            .get_json(&self.catalog_url(storefront, &path), &query)
            .await?;
        let mut resource = page
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(kind_name(kind), id))?;

        // Long collections return their tracks in pages.
        let mut extra = Vec::new();
        let mut next = resource
            .relationships
            .tracks
            .as_mut()
            .and_then(|t| t.next.take());
        let mut pages = 0;
        while let Some(href) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                warn!(id, "Track pagination limit reached");
                break;
            }
            let mut query = self.language_query();
            query.push(("extend", "extendedAssetUrls".to_string()));
            let page: Page = self.get_json(&self.absolute(&href), &query).await?;
            extra.extend(page.data);
            next = page.next;
        }

        Ok(resource.into_collection(kind, storefront, extra))
    }
}

fn kind_name(kind: CollectionKind) -> &'static str {
    match kind {
        CollectionKind::Album => "Album",
        CollectionKind::Playlist => "Playlist",
    }
}

/// Fill an artwork URL template with a size and extension.
pub fn artwork_url(template: &str, size: &str, format: &str) -> String {
    let mut url = template.replacen("{w}x{h}", size, 1);
    if format == "png" {
        if let Some(pos) = url.rfind(".jpg") {
            url.replace_range(pos..pos + 4, ".png");
        }
    }
    url
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn album(&self, storefront: &str, id: &str) -> Result<Collection> {
        self.collection(CollectionKind::Album, storefront, id).await
    }

    async fn playlist(&self, storefront: &str, id: &str) -> Result<Collection> {
        self.collection(CollectionKind::Playlist, storefront, id).await
    }

    async fn song_album_id(&self, storefront: &str, song_id: &str) -> Result<String> {
        let mut query = self.language_query();
        query.push(("include", "albums".to_string()));
        let page: Page = self
            .get_json(&self.catalog_url(storefront, &format!("songs/{song_id}")), &query)
            .await?;
        page.data
            .into_iter()
            .next()
            .and_then(|song| song.relationships.albums)
            .and_then(|albums| albums.data.into_iter().next())
            .map(|album| album.id)
            .ok_or_else(|| Error::not_found("Song", song_id))
    }

    async fn music_video(&self, storefront: &str, id: &str) -> Result<MusicVideo> {
        let page: Page = self
            .get_json(
                &self.catalog_url(storefront, &format!("music-videos/{id}")),
                &self.language_query(),
            )
            .await?;
        page.data
            .into_iter()
            .next()
            .map(Resource::into_music_video)
            .ok_or_else(|| Error::not_found("MusicVideo", id))
    }

    async fn music_video_manifest(&self, id: &str) -> Result<String> {
        if !self.config.has_media_user_token() {
            return Err(Error::unavailable("media-user-token not set"));
        }
        let body = serde_json::json!({ "salableAdamId": id });
        let mut headers = self.headers()?;
        let cookie = format!("media-user-token={}", self.config.media_user_token.trim());
        headers.insert(
            reqwest::header::COOKIE,
            HeaderValue::from_str(&cookie)
                .map_err(|e| Error::config(format!("invalid media-user token: {e}")))?,
        );

        let response: WebPlaybackResponse = self
            .client
            .post(&self.config.playback_url)
            .headers(headers)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .song_list
            .into_iter()
            .find_map(|s| s.hls_playlist_url.filter(|u| !u.is_empty()))
            .ok_or_else(|| {
                let reason = response
                    .failure_type
                    .map(|f| format!(" ({f})"))
                    .unwrap_or_default();
                Error::unavailable(format!("media-user-token may be wrong or expired{reason}"))
            })
    }

    async fn artist_albums(&self, storefront: &str, artist_id: &str) -> Result<Vec<AlbumSummary>> {
        let url = self.catalog_url(storefront, &format!("artists/{artist_id}/albums"));
        let mut albums = Vec::new();
        let mut offset = 0;

        for _ in 0..MAX_PAGES {
            let mut query = self.language_query();
            query.push(("limit", PAGE_LIMIT.to_string()));
            query.push(("offset", offset.to_string()));
            let page: Page = self.get_json(&url, &query).await?;
            albums.extend(page.data.into_iter().map(Resource::into_album_summary));
            if page.next.is_none() {
                break;
            }
            offset += PAGE_LIMIT;
        }

        // ISO dates sort lexically; stable so undated albums keep catalog order.
        albums.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(albums)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchItem>> {
        let mut params = self.language_query();
        params.push(("term", query.term.clone()));
        params.push(("types", query.kind.resource_type().to_string()));
        params.push(("limit", query.limit.to_string()));
        params.push(("offset", query.offset.to_string()));

        let response: SearchResponse = self
            .get_json(
                &self.catalog_url(&self.config.storefront, "search"),
                &params,
            )
            .await?;

        let results = response.results;
        let items = match query.kind {
            SearchKind::Album => results
                .albums
                .unwrap_or_default()
                .data
                .into_iter()
                .map(Resource::into_album_hit)
                .collect(),
            SearchKind::Song => results
                .songs
                .unwrap_or_default()
                .data
                .into_iter()
                .map(Resource::into_song_hit)
                .collect(),
            SearchKind::Artist => results
                .artists
                .unwrap_or_default()
                .data
                .into_iter()
                .map(Resource::into_artist_hit)
                .collect(),
        };
        Ok(items)
    }

    async fn download_artwork(&self, template: &str, dest: &Path) -> Result<()> {
        let url = artwork_url(template, &self.cover_size, &self.cover_format);
        let bytes = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        fs::ensure_parent_dir(dest).await?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| Error::io_path("writing artwork", dest, e))?;
        debug!(path = %dest.display(), "Artwork saved");
        Ok(())
    }
}
