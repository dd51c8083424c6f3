//! Catalog entities as the pipeline sees them.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Album,
    Playlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackKind {
    Song,
    MusicVideo,
}

/// An album or playlist with its items in catalog order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub kind: CollectionKind,
    pub id: String,
    pub storefront: String,
    pub name: String,
    pub artist_name: String,
    pub artist_id: Option<String>,
    /// `YYYY-MM-DD` when known.
    pub release_date: Option<String>,
    pub upc: Option<String>,
    pub record_label: Option<String>,
    pub copyright: Option<String>,
    /// Artwork URL template containing `{w}x{h}`.
    pub artwork_url: Option<String>,
    pub content_rating: Option<String>,
    pub is_apple_digital_master: bool,
    pub tracks: Vec<Track>,
}

impl Collection {
    pub fn release_year(&self) -> Option<&str> {
        self.release_date.as_deref().and_then(|d| d.get(..4))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub kind: TrackKind,
    pub name: String,
    pub artist_name: String,
    pub album_name: String,
    pub disc_number: u32,
    pub track_number: u32,
    pub content_rating: Option<String>,
    pub is_apple_digital_master: bool,
    /// HLS master playlist for the lossless/spatial renditions, when the catalog offers one.
    pub manifest_url: Option<String>,
    pub artwork_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicVideo {
    pub id: String,
    pub name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<String>,
    pub isrc: Option<String>,
    pub content_rating: Option<String>,
    pub artwork_url: Option<String>,
    pub disc_number: u32,
    pub track_number: u32,
}

/// One album of an artist's discography.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    pub date: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Album,
    Song,
    Artist,
}

impl SearchKind {
    /// Resource type name used by the catalog search endpoint.
    pub fn resource_type(&self) -> &'static str {
        match self {
            SearchKind::Album => "albums",
            SearchKind::Song => "songs",
            SearchKind::Artist => "artists",
        }
    }
}

impl std::str::FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "album" => Ok(SearchKind::Album),
            "song" => Ok(SearchKind::Song),
            "artist" => Ok(SearchKind::Artist),
            other => Err(format!("unknown search type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub kind: SearchKind,
    pub limit: u32,
    pub offset: u32,
}

/// A search hit. Fields that do not apply to the kind are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<String>,
    pub url: String,
}
