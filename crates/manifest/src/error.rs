use thiserror::Error;

use crate::tier::QualityTier;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("failed to parse playlist: {0}")]
    Parse(String),

    #[error("playlist is not a master playlist")]
    NotMaster,

    #[error("invalid variant uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("no acceptable {tier} variant within the configured ceiling")]
    NoAcceptableVariant { tier: QualityTier },

    #[error("no video variant at or below {max_height}p")]
    NoAcceptableVideo { max_height: u32 },

    #[error("no suitable audio stream found")]
    NoAudioRendition,
}
