//! Fetches HLS master playlists and picks the rendition to download.

use async_trait::async_trait;
use manifest::{
    Ceilings, MasterPlaylist, QualityTier, Variant, VariantSelector, parse_master, select_mv_audio,
    select_video,
};
use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// The audio stream chosen for a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub url: String,
    /// e.g. `24B-96.0kHz` or `256 Kbps`.
    pub quality_label: String,
    pub variant: Variant,
}

/// Video and audio streams chosen for a music video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVideo {
    pub video_url: String,
    pub audio_url: String,
    pub height: u32,
}

#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve_audio(&self, manifest_url: &str, tier: QualityTier) -> Result<ResolvedStream>;

    async fn resolve_video(&self, manifest_url: &str) -> Result<ResolvedVideo>;
}

/// [`StreamResolver`] that downloads the master playlist over HTTP.
pub struct ManifestResolver {
    client: reqwest::Client,
    ceilings: Ceilings,
}

impl ManifestResolver {
    pub fn new(client: reqwest::Client, ceilings: Ceilings) -> Self {
        Self { client, ceilings }
    }

    async fn fetch_master(&self, manifest_url: &str) -> Result<MasterPlaylist> {
        let base = Url::parse(manifest_url)
            .map_err(|e| Error::Manifest(format!("invalid manifest url '{manifest_url}': {e}")))?;
        let body = self
            .client
            .get(base.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(parse_master(&body, &base)?)
    }
}

#[async_trait]
impl StreamResolver for ManifestResolver {
    async fn resolve_audio(&self, manifest_url: &str, tier: QualityTier) -> Result<ResolvedStream> {
        let master = self.fetch_master(manifest_url).await?;
        let selection = VariantSelector::new(tier, self.ceilings).select(&master.variants)?;
        Ok(ResolvedStream {
            url: selection.variant.uri.clone(),
            quality_label: selection.quality_label,
            variant: selection.variant,
        })
    }

    async fn resolve_video(&self, manifest_url: &str) -> Result<ResolvedVideo> {
        let master = self.fetch_master(manifest_url).await?;
        let video = select_video(&master.variants, self.ceilings.mv_max)?;
        let audio = select_mv_audio(&master.audio_renditions)?;
        debug!(height = video.height, audio_group = %audio.group_id, "Selected music video streams");
        Ok(ResolvedVideo {
            video_url: video.variant.uri.clone(),
            audio_url: audio.uri.clone(),
            height: video.height,
        })
    }
}
