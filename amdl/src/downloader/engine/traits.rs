//! Interface to the external programs that download, decrypt, mux and tag media.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::Result;

/// What to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSource {
    /// A resolved HLS media playlist.
    Stream { url: String },
    /// The lossy path keyed by item id alone. Needs a media-user token.
    Legacy,
    /// Separate video and audio playlists muxed into one file.
    Video { video_url: String, audio_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub item_id: String,
    pub source: FetchSource,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRequest {
    pub path: PathBuf,
    /// Ordered `key=value` pairs.
    pub tags: Vec<(String, String)>,
    pub cover: Option<PathBuf>,
}

impl TagRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn with_cover(mut self, cover: Option<PathBuf>) -> Self {
        self.cover = cover;
        self
    }
}

/// Runs the external tools. Implementations must not be interrupted midway;
/// cancellation is observed between calls.
#[async_trait]
pub trait ExternalTool: Send + Sync {
    /// Produce a decrypted file at `request.output`.
    async fn fetch(&self, request: &FetchRequest) -> Result<()>;

    /// Write metadata (and optionally cover art) into an existing file.
    async fn tag(&self, request: &TagRequest) -> Result<()>;
}
