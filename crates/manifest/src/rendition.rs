use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::{ManifestError, Result};

/// Audio groups a music video may take its audio from.
pub const MV_AUDIO_GROUPS: [&str; 3] = ["audio-atmos", "audio-ac3", "audio-stereo-256"];

static RANK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_gr(\d+)_").unwrap());

/// An `#EXT-X-MEDIA:TYPE=AUDIO` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioRendition {
    pub group_id: String,
    /// URI resolved against the master playlist URL.
    pub uri: String,
    /// Rank encoded in the URI as `_gr<N>_`, 0 when absent.
    pub rank: u32,
}

impl AudioRendition {
    pub fn new(group_id: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let rank = RANK
            .captures(&uri)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(0);
        Self {
            group_id: group_id.into(),
            uri,
            rank,
        }
    }
}

/// Pick the audio rendition for a music video.
///
/// Only renditions in one of [`MV_AUDIO_GROUPS`] are eligible; among those the
/// highest rank wins and ties keep playlist order.
pub fn select_mv_audio(renditions: &[AudioRendition]) -> Result<&AudioRendition> {
    let mut best: Option<&AudioRendition> = None;
    for rendition in renditions
        .iter()
        .filter(|r| MV_AUDIO_GROUPS.contains(&r.group_id.as_str()))
    {
        if best.is_none_or(|b| rendition.rank > b.rank) {
            best = Some(rendition);
        }
    }
    best.ok_or(ManifestError::NoAudioRendition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_parsed_from_uri() {
        let r = AudioRendition::new("audio-atmos", "https://cdn/a_gr2768_en.m3u8");
        assert_eq!(r.rank, 2768);
        let r = AudioRendition::new("audio-atmos", "https://cdn/plain.m3u8");
        assert_eq!(r.rank, 0);
    }

    #[test]
    fn test_highest_rank_among_allowed_groups() {
        let renditions = vec![
            AudioRendition::new("audio-stereo-256", "s_gr256_.m3u8"),
            AudioRendition::new("audio-stereo-64", "s_gr9999_.m3u8"),
            AudioRendition::new("audio-atmos", "a_gr2768_.m3u8"),
            AudioRendition::new("audio-ac3", "c_gr384_.m3u8"),
        ];
        let picked = select_mv_audio(&renditions).unwrap();
        assert_eq!(picked.group_id, "audio-atmos");
    }

    #[test]
    fn test_ties_keep_playlist_order() {
        let renditions = vec![
            AudioRendition::new("audio-ac3", "first_gr10_.m3u8"),
            AudioRendition::new("audio-atmos", "second_gr10_.m3u8"),
        ];
        assert_eq!(select_mv_audio(&renditions).unwrap().uri, "first_gr10_.m3u8");
    }

    #[test]
    fn test_no_allowed_group() {
        let renditions = vec![AudioRendition::new("audio-stereo-64", "x_gr64_.m3u8")];
        assert_eq!(
            select_mv_audio(&renditions).unwrap_err(),
            ManifestError::NoAudioRendition
        );
    }
}
