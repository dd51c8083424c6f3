//! HLS master playlist parsing and quality-tier variant selection.
//!
//! The crate is pure: it never performs I/O. Callers fetch the playlist body
//! and hand it to [`parse_master`], then pick a variant with
//! [`VariantSelector`], [`select_video`] or [`select_mv_audio`].

mod error;
mod rendition;
mod selector;
mod tier;
mod variant;
mod video;

pub use error::ManifestError;
pub use rendition::{AudioRendition, MV_AUDIO_GROUPS, select_mv_audio};
pub use selector::{Selection, VariantSelector};
pub use tier::{Ceilings, QualityTier};
pub use variant::{MasterPlaylist, Variant, parse_master};
pub use video::{VideoSelection, select_video};

pub type Result<T> = std::result::Result<T, ManifestError>;
