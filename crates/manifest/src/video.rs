use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::{ManifestError, Result, Variant};

static DIMENSIONS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(\d+)x(\d+)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoSelection {
    pub variant: Variant,
    pub height: u32,
}

/// Pick the first video variant whose height is within `max_height`.
///
/// Height comes from the `_<w>x<h>` marker in the URI, falling back to the
/// advertised `RESOLUTION` attribute.
pub fn select_video(variants: &[Variant], max_height: u32) -> Result<VideoSelection> {
    variants
        .iter()
        .find_map(|v| {
            let height = height_of(v)?;
            (height <= max_height).then(|| VideoSelection {
                variant: v.clone(),
                height,
            })
        })
        .ok_or(ManifestError::NoAcceptableVideo { max_height })
}

fn height_of(variant: &Variant) -> Option<u32> {
    if let Some(caps) = DIMENSIONS.captures(&variant.uri) {
        return caps[2].parse().ok();
    }
    variant
        .resolution
        .and_then(|(_, h)| u32::try_from(h).ok())
}
