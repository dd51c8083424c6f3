//! Quality-tier variant selection.
//!
//! Variants are scanned in the order produced by [`crate::parse_master`]
//! (descending bandwidth) and the first one that belongs to the requested
//! tier and sits within that tier's ceiling wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::{Ceilings, ManifestError, QualityTier, Result, Variant};

static AAC_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^audio-stereo-(\d+)$").unwrap());

/// The chosen variant plus a human-readable quality label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub variant: Variant,
    /// `"24B-96.0kHz"` for lossless, `"256 Kbps"` for lossy tiers.
    pub quality_label: String,
}

/// Picks the best variant of a tier under a set of ceilings.
#[derive(Debug, Clone, Copy)]
pub struct VariantSelector {
    tier: QualityTier,
    ceilings: Ceilings,
}

impl VariantSelector {
    pub fn new(tier: QualityTier, ceilings: Ceilings) -> Self {
        Self { tier, ceilings }
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    /// Select the first acceptable variant.
    pub fn select(&self, variants: &[Variant]) -> Result<Selection> {
        for variant in variants {
            if let Some(quality_label) = self.accept(variant) {
                debug!(
                    tier = %self.tier,
                    audio_group = %variant.audio_group,
                    quality = %quality_label,
                    "Selected variant"
                );
                return Ok(Selection {
                    variant: variant.clone(),
                    quality_label,
                });
            }
        }

        Err(ManifestError::NoAcceptableVariant { tier: self.tier })
    }

    /// Returns the quality label when the variant is acceptable for this tier.
    fn accept(&self, variant: &Variant) -> Option<String> {
        match self.tier {
            QualityTier::Alac => self.accept_alac(variant),
            QualityTier::Aac => self.accept_aac(variant),
            QualityTier::Atmos => self.accept_atmos(variant),
        }
    }

    fn accept_alac(&self, variant: &Variant) -> Option<String> {
        if variant.codecs != "alac" {
            return None;
        }
        let fields = variant.group_fields();
        if fields.len() < 3 {
            return None;
        }
        let bit_depth = fields[fields.len() - 1];
        let sample_rate: u32 = fields[fields.len() - 2].parse().ok()?;
        if sample_rate > self.ceilings.alac_max {
            return None;
        }
        let khz = f64::from(sample_rate) / 1000.0;
        Some(format!("{bit_depth}B-{khz:.1}kHz"))
    }

    fn accept_aac(&self, variant: &Variant) -> Option<String> {
        if variant.codecs != "mp4a.40.2" {
            return None;
        }
        let caps = AAC_GROUP.captures(&variant.audio_group)?;
        let kbps: u32 = caps[1].parse().ok()?;
        if kbps > self.ceilings.aac_max {
            return None;
        }
        Some(format!("{kbps} Kbps"))
    }

    fn accept_atmos(&self, variant: &Variant) -> Option<String> {
        let fields = variant.group_fields();
        let last = fields.last().copied()?;

        if variant.codecs == "ec-3" && variant.audio_group.contains("atmos") {
            let kbps: u32 = last.parse().ok()?;
            if kbps > self.ceilings.atmos_max {
                return None;
            }
            return Some(format!("{last} Kbps"));
        }

        // Dolby Audio carries no ceiling of its own.
        if variant.codecs == "ac-3" {
            return Some(format!("{last} Kbps"));
        }

        None
    }
}
