//! In-process stand-ins for the catalog, the manifest resolver and the
//! external tools, shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use amdl::catalog::{
    AlbumSummary, CatalogClient, Collection, CollectionKind, MusicVideo, SearchItem, SearchQuery,
    Track, TrackKind,
};
use amdl::config::{EngineConfig, StorageConfig};
use amdl::downloader::{
    ExternalTool, FetchRequest, ResolvedStream, ResolvedVideo, StreamResolver, TagRequest,
};
use amdl::pipeline::{Job, TaskRegistry};
use amdl::{Error, Result};
use async_trait::async_trait;
use manifest::{QualityTier, Variant};
use parking_lot::Mutex;

pub const ALBUM_ID: &str = "1000";
pub const ALBUM_URL: &str = "https://music.apple.com/us/album/test-album/1000";
pub const VIDEO_ID: &str = "2000";
pub const VIDEO_URL: &str = "https://music.apple.com/us/music-video/test-video/2000";

pub fn track(id: &str, number: u32, name: &str, manifest: bool) -> Track {
    Track {
        id: id.to_string(),
        kind: TrackKind::Song,
        name: name.to_string(),
        artist_name: "Test Artist".to_string(),
        album_name: "Test Album".to_string(),
        disc_number: 1,
        track_number: number,
        content_rating: None,
        is_apple_digital_master: false,
        manifest_url: manifest.then(|| format!("https://media.test/{id}/master.m3u8")),
        artwork_url: None,
    }
}

pub fn album(tracks: Vec<Track>) -> Collection {
    Collection {
        kind: CollectionKind::Album,
        id: ALBUM_ID.to_string(),
        storefront: "us".to_string(),
        name: "Test Album".to_string(),
        artist_name: "Test Artist".to_string(),
        artist_id: Some("42".to_string()),
        release_date: Some("2024-01-02".to_string()),
        upc: None,
        record_label: None,
        copyright: None,
        artwork_url: Some("https://img.test/cover/{w}x{h}bb.jpg".to_string()),
        content_rating: None,
        is_apple_digital_master: false,
        tracks,
    }
}

pub fn three_track_album(manifest: bool) -> Collection {
    album(vec![
        track("11", 1, "Song One", manifest),
        track("12", 2, "Song Two", manifest),
        track("13", 3, "Song Three", manifest),
    ])
}

pub fn music_video() -> MusicVideo {
    MusicVideo {
        id: VIDEO_ID.to_string(),
        name: "Test Video".to_string(),
        artist_name: "Test Artist".to_string(),
        album_name: None,
        genre: Some("Pop".to_string()),
        release_date: Some("2024-01-02".to_string()),
        isrc: Some("USTEST0000001".to_string()),
        content_rating: Some("explicit".to_string()),
        artwork_url: Some("https://img.test/video/{w}x{h}bb.jpg".to_string()),
        disc_number: 1,
        track_number: 1,
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    pub albums: HashMap<String, Collection>,
    pub videos: HashMap<String, MusicVideo>,
    pub artist_albums: Vec<AlbumSummary>,
    pub search_items: Vec<SearchItem>,
    pub searches: Mutex<Vec<SearchQuery>>,
}

impl FakeCatalog {
    pub fn with_album(mut self, collection: Collection) -> Self {
        self.albums.insert(collection.id.clone(), collection);
        self
    }

    pub fn with_video(mut self, video: MusicVideo) -> Self {
        self.videos.insert(video.id.clone(), video);
        self
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn album(&self, _storefront: &str, id: &str) -> Result<Collection> {
        self.albums
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("Album", id))
    }

    async fn playlist(&self, _storefront: &str, id: &str) -> Result<Collection> {
        Err(Error::not_found("Playlist", id))
    }

    async fn song_album_id(&self, _storefront: &str, song_id: &str) -> Result<String> {
        self.albums
            .values()
            .find(|a| a.tracks.iter().any(|t| t.id == song_id))
            .map(|a| a.id.clone())
            .ok_or_else(|| Error::not_found("Song", song_id))
    }

    async fn music_video(&self, _storefront: &str, id: &str) -> Result<MusicVideo> {
        self.videos
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("MusicVideo", id))
    }

    async fn music_video_manifest(&self, id: &str) -> Result<String> {
        Ok(format!("https://media.test/mv/{id}/master.m3u8"))
    }

    async fn artist_albums(&self, _storefront: &str, _artist_id: &str) -> Result<Vec<AlbumSummary>> {
        Ok(self.artist_albums.clone())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchItem>> {
        self.searches.lock().push(query.clone());
        Ok(self.search_items.clone())
    }

    async fn download_artwork(&self, _template: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, b"artwork").await?;
        Ok(())
    }
}

/// Picks every manifest's only rendition.
pub struct FakeResolver;

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn resolve_audio(&self, manifest_url: &str, _tier: QualityTier) -> Result<ResolvedStream> {
        Ok(ResolvedStream {
            url: manifest_url.replace("master", "alac"),
            quality_label: "24B-96.0kHz".to_string(),
            variant: Variant {
                uri: manifest_url.to_string(),
                codecs: "alac".to_string(),
                audio_group: "audio-alac-stereo-96000-24".to_string(),
                bandwidth: 1_000_000,
                average_bandwidth: None,
                resolution: None,
            },
        })
    }

    async fn resolve_video(&self, manifest_url: &str) -> Result<ResolvedVideo> {
        Ok(ResolvedVideo {
            video_url: manifest_url.replace("master", "video"),
            audio_url: manifest_url.replace("master", "audio"),
            height: 1080,
        })
    }
}

/// Writes a placeholder file for every fetch and records every call.
#[derive(Default)]
pub struct FakeTool {
    pub fetches: Mutex<Vec<FetchRequest>>,
    pub tags: Mutex<Vec<TagRequest>>,
    /// Number of upcoming fetches that fail with a tool error.
    pub failures: AtomicU32,
    pub fetch_delay: Duration,
}

impl FakeTool {
    pub fn failing(times: u32) -> Self {
        Self {
            failures: AtomicU32::new(times),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            fetch_delay: delay,
            ..Default::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().len()
    }
}

#[async_trait]
impl ExternalTool for FakeTool {
    async fn fetch(&self, request: &FetchRequest) -> Result<()> {
        self.fetches.lock().push(request.clone());
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::tool("downloader exited with status 1"));
        }
        tokio::fs::write(&request.output, b"media").await?;
        Ok(())
    }

    async fn tag(&self, request: &TagRequest) -> Result<()> {
        self.tags.lock().push(request.clone());
        Ok(())
    }
}

/// Download folders rooted in a scratch directory.
pub fn storage_in(root: &Path) -> StorageConfig {
    StorageConfig {
        alac_save_folder: root.join("alac"),
        aac_save_folder: root.join("aac"),
        atmos_save_folder: root.join("atmos"),
        mv_save_folder: root.join("mv"),
        ..Default::default()
    }
}

pub fn engine_config() -> EngineConfig {
    EngineConfig {
        workers: 1,
        queue_capacity: 16,
        retry_delay_secs: 0,
        default_max_retries: 0,
        log_capacity: 200,
        stream_interval_ms: 10,
    }
}

/// Poll until the job is succeeded or failed.
pub async fn wait_for_terminal(registry: &TaskRegistry, id: &str) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = registry.get(id).expect("job exists");
        if job.status.is_terminal() {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} did not finish, last status {}",
            job.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn log_messages(job: &Job) -> Vec<String> {
    job.logs.iter().map(|e| e.message.clone()).collect()
}

pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
