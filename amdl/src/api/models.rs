//! API request and response models (DTOs).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::{AlbumSummary, SearchItem};
use crate::pipeline::JobStats;

/// Separators accepted between URLs in a single submitted string.
static URL_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+").unwrap());

// ============================================================================
// Tasks
// ============================================================================

/// Body of `POST /tasks`.
///
/// `url` is the older single-field form. Any string may hold several URLs
/// separated by commas or whitespace.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTasksRequest {
    pub urls: Vec<String>,
    pub url: Option<String>,
    pub quality: Option<String>,
    pub tracks: Vec<u32>,
    pub song_only: bool,
    pub max_retries: Option<i64>,
}

impl CreateTasksRequest {
    /// Every non-empty target URL, in submission order.
    pub fn targets(&self) -> Vec<String> {
        self.urls
            .iter()
            .map(String::as_str)
            .chain(self.url.as_deref())
            .flat_map(|raw| URL_SEPARATORS.split(raw.trim()))
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
            .collect()
    }

    /// Absent or zero means `default`, negative means no retries.
    pub fn effective_max_retries(&self, default: u32) -> u32 {
        match self.max_retries {
            None | Some(0) => default,
            Some(n) if n < 0 => 0,
            Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTasksResponse {
    pub task_ids: Vec<String>,
    pub count: usize,
}

/// `{status}` acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

// ============================================================================
// Metadata and search
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumTrackItem {
    pub index: usize,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumMetaResponse {
    pub title: String,
    pub artist: String,
    pub cover: String,
    pub tracks: Vec<AlbumTrackItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtistAlbumsResponse {
    pub albums: Vec<AlbumSummary>,
}

/// Query of `GET /search`. Numbers are parsed leniently.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl SearchParams {
    /// `1..=50`, otherwise 20.
    pub fn effective_limit(&self) -> u32 {
        match self.limit.as_deref().and_then(|l| l.trim().parse::<i64>().ok()) {
            Some(n) if (1..=50).contains(&n) => n as u32,
            _ => 20,
        }
    }

    /// Negative or unparsable offsets become 0.
    pub fn effective_offset(&self) -> u32 {
        self.offset
            .as_deref()
            .and_then(|o| o.trim().parse::<i64>().ok())
            .map(|n| n.clamp(0, u32::MAX as i64) as u32)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
}

// ============================================================================
// Maintenance
// ============================================================================

/// Result for one download folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FolderCleanup {
    #[serde(rename_all = "camelCase")]
    Cleaned {
        folder: String,
        deleted_files: usize,
        deleted_dirs: usize,
    },
    Skipped {
        folder: String,
        skipped: bool,
        reason: String,
    },
    Failed {
        folder: String,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub deleted_files: usize,
    pub deleted_dirs: usize,
    pub folders: Vec<FolderCleanup>,
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub jobs: JobStats,
}
