use m3u8_rs::{AlternativeMediaType, Playlist, parse_playlist_res};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::rendition::AudioRendition;
use crate::{ManifestError, Result};

/// The parts of a master playlist the selectors work with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MasterPlaylist {
    /// Variants ordered by descending bandwidth.
    pub variants: Vec<Variant>,
    /// `#EXT-X-MEDIA:TYPE=AUDIO` renditions that carry a URI.
    pub audio_renditions: Vec<AudioRendition>,
}

/// A single `#EXT-X-STREAM-INF` entry of a master playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    /// Stream URI resolved against the master playlist URL.
    pub uri: String,
    /// Codec tag, e.g. `alac`, `mp4a.40.2`, `ec-3`.
    pub codecs: String,
    /// Audio rendition group, e.g. `audio-alac-stereo-96000-24`.
    pub audio_group: String,
    pub bandwidth: u64,
    pub average_bandwidth: Option<u64>,
    /// `(width, height)` when advertised.
    pub resolution: Option<(u64, u64)>,
}

impl Variant {
    /// Bandwidth used for ordering: the average when advertised, otherwise the peak.
    pub fn sort_bandwidth(&self) -> u64 {
        self.average_bandwidth.unwrap_or(self.bandwidth)
    }

    /// Dash-separated fields of the audio group.
    pub(crate) fn group_fields(&self) -> Vec<&str> {
        self.audio_group.split('-').collect()
    }
}

/// Parse a master playlist body.
///
/// Variants are sorted by descending bandwidth. The sort is stable so
/// variants advertising equal bandwidth keep their playlist order. I-frame
/// only streams are skipped. Relative URIs are resolved against `base`.
pub fn parse_master(body: &[u8], base: &Url) -> Result<MasterPlaylist> {
    let master = match parse_playlist_res(body) {
        Ok(Playlist::MasterPlaylist(pl)) => pl,
        Ok(Playlist::MediaPlaylist(_)) => return Err(ManifestError::NotMaster),
        Err(e) => return Err(ManifestError::Parse(e.to_string())),
    };

    let mut variants = Vec::with_capacity(master.variants.len());
    for stream in master.variants.into_iter().filter(|v| !v.is_i_frame) {
        let uri = resolve(base, &stream.uri)?;

        variants.push(Variant {
            uri,
            codecs: stream.codecs.unwrap_or_default(),
            audio_group: stream.audio.unwrap_or_default(),
            bandwidth: stream.bandwidth,
            average_bandwidth: stream.average_bandwidth,
            resolution: stream.resolution.map(|r| (r.width, r.height)),
        });
    }

    variants.sort_by(|a, b| b.sort_bandwidth().cmp(&a.sort_bandwidth()));

    let mut audio_renditions = Vec::new();
    for media in master.alternatives {
        if media.media_type != AlternativeMediaType::Audio {
            continue;
        }
        let Some(uri) = media.uri.as_deref().filter(|u| !u.is_empty()) else {
            continue;
        };
        audio_renditions.push(AudioRendition::new(media.group_id, resolve(base, uri)?));
    }

    debug!(
        variants = variants.len(),
        audio_renditions = audio_renditions.len(),
        "Parsed master playlist"
    );
    Ok(MasterPlaylist {
        variants,
        audio_renditions,
    })
}

fn resolve(base: &Url, uri: &str) -> Result<String> {
    base.join(uri)
        .map(|u| u.to_string())
        .map_err(|e| ManifestError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })
}
