//! Catalog access: URL classification, the client interface and its HTTP adapter.

mod api_types;
mod client;
mod models;
mod url;

pub use client::{CatalogClient, HttpCatalogClient, artwork_url};
pub use models::{
    AlbumSummary, Collection, CollectionKind, MusicVideo, SearchItem, SearchKind, SearchQuery,
    Track, TrackKind,
};
pub use url::CatalogUrl;
