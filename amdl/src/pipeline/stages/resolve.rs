//! Decides how a track is obtained and which quality label it carries.

use manifest::{Ceilings, QualityTier};

use crate::catalog::Track;
use crate::downloader::{ResolvedStream, StreamResolver};
use crate::pipeline::progress::ProgressReporter;
use crate::{Error, Result};

/// Label used for the legacy lossy path.
pub(crate) const LEGACY_QUALITY: &str = "256Kbps";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Plan {
    Stream(ResolvedStream),
    /// No manifest: fall back to the lossy path keyed by track id.
    Legacy,
}

impl Plan {
    /// Value of the `{Quality}` placeholder.
    pub fn quality_label(&self, tier: QualityTier, ceilings: &Ceilings) -> String {
        match (self, tier) {
            (_, QualityTier::Atmos) => atmos_label(ceilings),
            (Plan::Legacy, _) => LEGACY_QUALITY.to_string(),
            (Plan::Stream(stream), _) => stream.quality_label.replace(' ', ""),
        }
    }
}

pub(crate) fn atmos_label(ceilings: &Ceilings) -> String {
    format!("{}Kbps", ceilings.atmos_max.saturating_sub(2000))
}

pub(crate) async fn plan_track(
    resolver: &dyn StreamResolver,
    track: &Track,
    tier: QualityTier,
    progress: &ProgressReporter,
) -> Result<Plan> {
    let Some(manifest_url) = track.manifest_url.as_deref().filter(|u| !u.is_empty()) else {
        if tier == QualityTier::Atmos {
            return Err(Error::unavailable("Unavailable"));
        }
        progress.info(format!("{}: Unavailable, trying to dl aac-lc", track.name));
        return Ok(Plan::Legacy);
    };

    let stream = resolver.resolve_audio(manifest_url, tier).await?;
    Ok(Plan::Stream(stream))
}
