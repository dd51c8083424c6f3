use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Requested encoding family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Apple Lossless.
    #[default]
    Alac,
    /// AAC-LC stereo.
    Aac,
    /// Dolby Atmos (E-AC-3), or Dolby Audio (AC-3) when offered.
    Atmos,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Alac => "alac",
            QualityTier::Aac => "aac",
            QualityTier::Atmos => "atmos",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alac" => Ok(QualityTier::Alac),
            "aac" => Ok(QualityTier::Aac),
            "atmos" => Ok(QualityTier::Atmos),
            other => Err(format!("unknown quality '{other}', expected alac|aac|atmos")),
        }
    }
}

/// Operator-configured upper bounds per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ceilings {
    /// Maximum ALAC sample rate in Hz.
    pub alac_max: u32,
    /// Maximum AAC bitrate in kbps.
    pub aac_max: u32,
    /// Maximum Atmos bitrate in kbps.
    pub atmos_max: u32,
    /// Maximum music-video height in pixels.
    pub mv_max: u32,
}

impl Default for Ceilings {
    fn default() -> Self {
        Self {
            alac_max: 192_000,
            aac_max: 256,
            atmos_max: 2768,
            mv_max: 2160,
        }
    }
}

impl Ceilings {
    pub fn for_tier(&self, tier: QualityTier) -> u32 {
        match tier {
            QualityTier::Alac => self.alac_max,
            QualityTier::Aac => self.aac_max,
            QualityTier::Atmos => self.atmos_max,
        }
    }
}
