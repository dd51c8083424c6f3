//! Application configuration.
//!
//! Settings live in a TOML file (default `config.toml`, overridable with
//! `AMDL_CONFIG`). A missing file is created with defaults. A handful of
//! environment variables (optionally from `.env`) override file values so
//! secrets can stay out of the file.

mod loader;

pub use loader::{CONFIG_PATH_ENV, load_or_init, load_with_env};

use std::path::PathBuf;
use std::time::Duration;

use manifest::{Ceilings, QualityTier};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Minimum length of a media-user token that is considered usable.
pub const MIN_MEDIA_USER_TOKEN_LEN: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub ceilings: Ceilings,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub enable_cors: bool,
    /// Request body size limit in bytes.
    pub body_limit: usize,
    /// Directory with the static web UI, served at `/` when present.
    pub web_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            body_limit: 1024 * 1024,
            web_dir: Some(PathBuf::from("web")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Capacity of the dispatch queue. Submissions beyond it are rejected.
    pub queue_capacity: usize,
    /// Delay between automatic retry attempts, in seconds.
    pub retry_delay_secs: u64,
    /// Retries used when a submission does not specify any.
    pub default_max_retries: u32,
    /// Maximum number of log lines retained per job.
    pub log_capacity: usize,
    /// Cadence of the per-job event stream, in milliseconds.
    pub stream_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 128,
            retry_delay_secs: 3,
            default_max_retries: 3,
            log_capacity: 1000,
            stream_interval_ms: 1000,
        }
    }
}

impl EngineConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }
}

/// Output layout. Templates use `{Placeholder}` tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub alac_save_folder: PathBuf,
    pub aac_save_folder: PathBuf,
    pub atmos_save_folder: PathBuf,
    pub mv_save_folder: PathBuf,
    /// `{ArtistName}`, `{ArtistId}`. Empty disables the artist level.
    pub artist_folder_format: String,
    /// `{AlbumName}`, `{AlbumId}`, `{ArtistName}`, `{ReleaseDate}`, `{ReleaseYear}`, `{Codec}`, `{Tag}`.
    pub album_folder_format: String,
    /// `{PlaylistName}`, `{PlaylistId}`, `{ArtistName}`, `{Codec}`.
    pub playlist_folder_format: String,
    /// `{SongId}`, `{SongNumer}`, `{SongName}`, `{DiscNumber}`, `{TrackNumber}`, `{Quality}`, `{Tag}`, `{Codec}`.
    pub song_file_format: String,
    /// Maximum number of characters taken from catalog names.
    pub limit_max: usize,
    pub embed_cover: bool,
    pub cover_size: String,
    pub cover_format: String,
    pub apple_master_choice: String,
    pub explicit_choice: String,
    pub clean_choice: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            alac_save_folder: PathBuf::from("AM-DL downloads"),
            aac_save_folder: PathBuf::from("AM-DL-AAC downloads"),
            atmos_save_folder: PathBuf::from("AM-DL-Atmos downloads"),
            mv_save_folder: PathBuf::from("AM-DL downloads"),
            artist_folder_format: "{ArtistName}".to_string(),
            album_folder_format: "{AlbumName}".to_string(),
            playlist_folder_format: "{PlaylistName}".to_string(),
            song_file_format: "{SongNumer}. {SongName}".to_string(),
            limit_max: 200,
            embed_cover: true,
            cover_size: "5000x5000".to_string(),
            cover_format: "jpg".to_string(),
            apple_master_choice: String::new(),
            explicit_choice: "[E]".to_string(),
            clean_choice: "[C]".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn save_folder(&self, tier: QualityTier) -> &PathBuf {
        match tier {
            QualityTier::Alac => &self.alac_save_folder,
            QualityTier::Aac => &self.aac_save_folder,
            QualityTier::Atmos => &self.atmos_save_folder,
        }
    }

    /// The folders the cleanup endpoint is allowed to empty.
    pub fn download_folders(&self) -> Vec<PathBuf> {
        let mut folders = vec![
            self.alac_save_folder.clone(),
            self.aac_save_folder.clone(),
            self.atmos_save_folder.clone(),
        ];
        if !folders.contains(&self.mv_save_folder) {
            folders.push(self.mv_save_folder.clone());
        }
        folders
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Web playback endpoint used to resolve music-video manifests.
    pub playback_url: String,
    /// Two-letter storefront used when a URL does not carry one.
    pub storefront: String,
    pub language: String,
    pub authorization_token: String,
    pub media_user_token: String,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://amp-api.music.apple.com".to_string(),
            playback_url: "https://play.itunes.apple.com/WebObjects/MZPlay.woa/wa/webPlayback"
                .to_string(),
            storefront: "us".to_string(),
            language: String::new(),
            authorization_token: String::new(),
            media_user_token: String::new(),
            timeout_secs: 30,
        }
    }
}

impl CatalogConfig {
    /// Bearer token without any `Bearer ` prefix the operator may have pasted.
    pub fn bearer_token(&self) -> &str {
        self.authorization_token
            .trim()
            .trim_start_matches("Bearer ")
            .trim()
    }

    pub fn has_media_user_token(&self) -> bool {
        self.media_user_token.trim().len() > MIN_MEDIA_USER_TOKEN_LEN
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External programs invoked by the fetch and tag stages.
///
/// Argument lists are templates. Recognised tokens: `{id}`, `{url}`,
/// `{output}`, `{video_url}`, `{audio_url}`, `{media_user_token}`,
/// `{authorization_token}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub fetch_program: String,
    pub fetch_args: Vec<String>,
    pub legacy_program: String,
    pub legacy_args: Vec<String>,
    pub video_program: String,
    pub video_args: Vec<String>,
    /// MP4Box, used for tagging.
    pub tag_program: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            fetch_program: "amdl-fetch".to_string(),
            fetch_args: vec![
                "--id".to_string(),
                "{id}".to_string(),
                "--url".to_string(),
                "{url}".to_string(),
                "--output".to_string(),
                "{output}".to_string(),
            ],
            legacy_program: "amdl-legacy".to_string(),
            legacy_args: vec![
                "--id".to_string(),
                "{id}".to_string(),
                "--token".to_string(),
                "{authorization_token}".to_string(),
                "--media-user-token".to_string(),
                "{media_user_token}".to_string(),
                "--output".to_string(),
                "{output}".to_string(),
            ],
            video_program: "amdl-video".to_string(),
            video_args: vec![
                "--id".to_string(),
                "{id}".to_string(),
                "--video".to_string(),
                "{video_url}".to_string(),
                "--audio".to_string(),
                "{audio_url}".to_string(),
                "--output".to_string(),
                "{output}".to_string(),
            ],
            tag_program: "MP4Box".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    /// Normalise and validate loaded values.
    pub fn validate(mut self) -> Result<Self> {
        let storefront = &self.catalog.storefront;
        if storefront.len() != 2 || !storefront.chars().all(|c| c.is_ascii_alphabetic()) {
            tracing::warn!(
                storefront = %self.catalog.storefront,
                "Storefront must be two letters, using 'us'"
            );
            self.catalog.storefront = "us".to_string();
        }
        self.catalog.storefront = self.catalog.storefront.to_ascii_lowercase();

        if self.engine.workers == 0 {
            return Err(Error::config("engine.workers must be at least 1"));
        }
        if self.engine.queue_capacity == 0 {
            return Err(Error::config("engine.queue_capacity must be at least 1"));
        }
        if self.engine.log_capacity == 0 {
            return Err(Error::config("engine.log_capacity must be at least 1"));
        }
        if self.engine.stream_interval_ms == 0 {
            return Err(Error::config("engine.stream_interval_ms must be positive"));
        }
        Ok(self)
    }
}
