//! Wire shapes of the catalog API. Only the fields the pipeline uses are modeled.

use serde::Deserialize;

use super::models::{
    AlbumSummary, Collection, CollectionKind, MusicVideo, SearchItem, Track, TrackKind,
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Page {
    #[serde(default)]
    pub data: Vec<Resource>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Resource {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub relationships: Relationships,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Relationships {
    pub tracks: Option<Page>,
    pub artists: Option<Page>,
    pub albums: Option<Page>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Attributes {
    pub name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub release_date: Option<String>,
    pub upc: Option<String>,
    pub record_label: Option<String>,
    pub copyright: Option<String>,
    pub artwork: Option<Artwork>,
    pub content_rating: Option<String>,
    pub is_apple_digital_master: bool,
    pub is_mastered_for_itunes: bool,
    pub track_count: Option<u32>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    pub genre_names: Vec<String>,
    pub isrc: Option<String>,
    pub url: Option<String>,
    pub extended_asset_urls: Option<ExtendedAssetUrls>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Artwork {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExtendedAssetUrls {
    pub enhanced_hls: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: SearchResults,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResults {
    pub albums: Option<Page>,
    pub songs: Option<Page>,
    pub artists: Option<Page>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WebPlaybackResponse {
    #[serde(default)]
    pub song_list: Vec<WebPlaybackSong>,
    #[serde(default)]
    pub failure_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebPlaybackSong {
    #[serde(rename = "hls-playlist-url", default)]
    pub hls_playlist_url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Resource {
    pub fn into_track(self, album_name: &str) -> Track {
        let kind = if self.kind == "music-videos" {
            TrackKind::MusicVideo
        } else {
            TrackKind::Song
        };
        let a = self.attributes;
        Track {
            id: self.id,
            kind,
            name: a.name,
            artist_name: a.artist_name,
            album_name: a.album_name.unwrap_or_else(|| album_name.to_string()),
            disc_number: a.disc_number.unwrap_or(1),
            track_number: a.track_number.unwrap_or(0),
            content_rating: non_empty(a.content_rating),
            is_apple_digital_master: a.is_apple_digital_master,
            manifest_url: non_empty(a.extended_asset_urls.and_then(|u| u.enhanced_hls)),
            artwork_url: a.artwork.map(|art| art.url).filter(|u| !u.is_empty()),
        }
    }

    /// Convert a collection resource. Tracks already fetched from later pages go in `extra`.
    pub fn into_collection(
        self,
        kind: CollectionKind,
        storefront: &str,
        extra: Vec<Resource>,
    ) -> Collection {
        let artist_id = self
            .relationships
            .artists
            .as_ref()
            .and_then(|p| p.data.first())
            .map(|r| r.id.clone());
        let a = self.attributes;
        let tracks = self
            .relationships
            .tracks
            .map(|p| p.data)
            .unwrap_or_default()
            .into_iter()
            .chain(extra)
            .map(|r| r.into_track(&a.name))
            .collect();

        Collection {
            kind,
            id: self.id,
            storefront: storefront.to_string(),
            name: a.name,
            artist_name: a.artist_name,
            artist_id,
            release_date: non_empty(a.release_date),
            upc: non_empty(a.upc),
            record_label: non_empty(a.record_label),
            copyright: non_empty(a.copyright),
            artwork_url: a.artwork.map(|art| art.url).filter(|u| !u.is_empty()),
            content_rating: non_empty(a.content_rating),
            is_apple_digital_master: a.is_apple_digital_master || a.is_mastered_for_itunes,
            tracks,
        }
    }

    pub fn into_music_video(self) -> MusicVideo {
        let a = self.attributes;
        MusicVideo {
            id: self.id,
            name: a.name,
            artist_name: a.artist_name,
            album_name: non_empty(a.album_name),
            genre: a.genre_names.into_iter().next(),
            release_date: non_empty(a.release_date),
            isrc: non_empty(a.isrc),
            content_rating: non_empty(a.content_rating),
            artwork_url: a.artwork.map(|art| art.url).filter(|u| !u.is_empty()),
            disc_number: a.disc_number.unwrap_or(1),
            track_number: a.track_number.unwrap_or(0),
        }
    }

    pub fn into_album_summary(self) -> AlbumSummary {
        AlbumSummary {
            id: self.id,
            name: self.attributes.name,
            date: self.attributes.release_date.unwrap_or_default(),
            url: self.attributes.url.unwrap_or_default(),
        }
    }

    pub fn into_album_hit(self) -> SearchItem {
        let a = self.attributes;
        SearchItem {
            id: self.id,
            name: a.name,
            artist: Some(a.artist_name),
            year: a.release_date.as_deref().and_then(|d| d.get(..4)).map(str::to_string),
            tracks: a.track_count,
            url: a.url.unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn into_song_hit(self) -> SearchItem {
        let a = self.attributes;
        SearchItem {
            id: self.id,
            name: a.name,
            artist: Some(a.artist_name),
            album: a.album_name,
            url: a.url.unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn into_artist_hit(self) -> SearchItem {
        let a = self.attributes;
        SearchItem {
            id: self.id,
            name: a.name,
            genres: Some(a.genre_names.join(", ")),
            url: a.url.unwrap_or_default(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALBUM: &str = r#"{
        "data": [{
            "id": "1440857781",
            "type": "albums",
            "attributes": {
                "name": "Album",
                "artistName": "Band",
                "releaseDate": "2011-03-04",
                "upc": "00602527",
                "contentRating": "explicit",
                "isMasteredForItunes": true,
                "artwork": {"url": "https://img/{w}x{h}bb.jpg"}
            },
            "relationships": {
                "artists": {"data": [{"id": "42", "type": "artists"}]},
                "tracks": {
                    "data": [
                        {"id": "1", "type": "songs", "attributes": {
                            "name": "One", "artistName": "Band", "discNumber": 1, "trackNumber": 1,
                            "extendedAssetUrls": {"enhancedHls": "https://cdn/1/master.m3u8"}
                        }},
                        {"id": "2", "type": "music-videos", "attributes": {
                            "name": "Two", "artistName": "Band", "trackNumber": 2
                        }}
                    ],
                    "next": "/v1/catalog/us/albums/1440857781/tracks?offset=2"
                }
            }
        }]
    }"#;

    #[test]
    fn test_album_conversion() {
        let page: Page = serde_json::from_str(ALBUM).unwrap();
        let resource = page.data.into_iter().next().unwrap();
        let album = resource.into_collection(CollectionKind::Album, "us", Vec::new());

        assert_eq!(album.name, "Album");
        assert_eq!(album.artist_id.as_deref(), Some("42"));
        assert_eq!(album.release_year(), Some("2011"));
        assert!(album.is_apple_digital_master);
        assert_eq!(album.tracks.len(), 2);
        assert_eq!(
            album.tracks[0].manifest_url.as_deref(),
            Some("https://cdn/1/master.m3u8")
        );
        assert_eq!(album.tracks[0].album_name, "Album");
        assert_eq!(album.tracks[1].kind, TrackKind::MusicVideo);
        assert!(album.tracks[1].manifest_url.is_none());
    }

    #[test]
    fn test_search_hits() {
        let json = r#"{"results": {"artists": {"data": [
            {"id": "7", "type": "artists", "attributes": {"name": "A", "genreNames": ["Rock", "Pop"], "url": "https://u"}}
        ]}}}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        let hit = resp.results.artists.unwrap().data.into_iter().next().unwrap().into_artist_hit();
        assert_eq!(hit.genres.as_deref(), Some("Rock, Pop"));
        assert!(hit.artist.is_none());
    }
}
