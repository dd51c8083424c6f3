//! Classification of catalog URLs.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

static ALBUM_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(?:beta\.music|music|classical\.music)\.apple\.com/(\w{2})(?:/album|/album/.+)/(?:id)?(\d{2,})(?:$|\?)",
    )
    .unwrap()
});

static SONG_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(?:beta\.music|music|classical\.music)\.apple\.com/(\w{2})(?:/song|/song/.+)/(?:id)?(\d{2,})(?:$|\?)",
    )
    .unwrap()
});

static MUSIC_VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(?:beta\.music|music)\.apple\.com/(\w{2})(?:/music-video|/music-video/.+)/(?:id)?(\d{2,})(?:$|\?)",
    )
    .unwrap()
});

static PLAYLIST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(?:beta\.music|music|classical\.music)\.apple\.com/(\w{2})(?:/playlist|/playlist/.+)/(?:id)?(pl\.[\w-]+)(?:$|\?)",
    )
    .unwrap()
});

static ARTIST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(?:beta\.music|music|classical\.music)\.apple\.com/(\w{2})(?:/artist|/artist/.+)/(?:id)?(\d{2,})(?:$|\?)",
    )
    .unwrap()
});

/// A recognised catalog URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogUrl {
    /// An album, optionally pointing at one track through `?i=`.
    Album {
        storefront: String,
        id: String,
        track_id: Option<String>,
    },
    Playlist {
        storefront: String,
        id: String,
    },
    Song {
        storefront: String,
        id: String,
    },
    MusicVideo {
        storefront: String,
        id: String,
    },
    Artist {
        storefront: String,
        id: String,
    },
}

impl CatalogUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let captures = |re: &Regex| {
            re.captures(raw)
                .map(|c| (c[1].to_ascii_lowercase(), c[2].to_string()))
        };

        let parsed = if raw.contains("/song/") {
            captures(&SONG_URL).map(|(storefront, id)| Self::Song { storefront, id })
        } else if raw.contains("/music-video/") {
            captures(&MUSIC_VIDEO_URL).map(|(storefront, id)| Self::MusicVideo { storefront, id })
        } else if raw.contains("/album/") {
            captures(&ALBUM_URL).map(|(storefront, id)| Self::Album {
                storefront,
                id,
                track_id: query_param(raw, "i"),
            })
        } else if raw.contains("/playlist/") {
            captures(&PLAYLIST_URL).map(|(storefront, id)| Self::Playlist { storefront, id })
        } else if raw.contains("/artist/") {
            captures(&ARTIST_URL).map(|(storefront, id)| Self::Artist { storefront, id })
        } else {
            None
        };

        parsed.ok_or_else(|| Error::validation(format!("invalid url type: {raw}")))
    }

    pub fn storefront(&self) -> &str {
        match self {
            Self::Album { storefront, .. }
            | Self::Playlist { storefront, .. }
            | Self::Song { storefront, .. }
            | Self::MusicVideo { storefront, .. }
            | Self::Artist { storefront, .. } => storefront,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Album { id, .. }
            | Self::Playlist { id, .. }
            | Self::Song { id, .. }
            | Self::MusicVideo { id, .. }
            | Self::Artist { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Album { .. } => "album",
            Self::Playlist { .. } => "playlist",
            Self::Song { .. } => "song",
            Self::MusicVideo { .. } => "music-video",
            Self::Artist { .. } => "artist",
        }
    }
}

impl fmt::Display for CatalogUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind(), self.id(), self.storefront())
    }
}

fn query_param(raw: &str, key: &str) -> Option<String> {
    let parsed = ::url::Url::parse(raw).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_url() {
        let url = CatalogUrl::parse("https://music.apple.com/us/album/some-name/1440857781").unwrap();
        assert_eq!(
            url,
            CatalogUrl::Album {
                storefront: "us".into(),
                id: "1440857781".into(),
                track_id: None,
            }
        );
    }

    #[test]
    fn test_album_url_with_track_param() {
        let url =
            CatalogUrl::parse("https://music.apple.com/jp/album/x/1440857781?i=1440857790").unwrap();
        match url {
            CatalogUrl::Album { storefront, track_id, .. } => {
                assert_eq!(storefront, "jp");
                assert_eq!(track_id.as_deref(), Some("1440857790"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_song_playlist_video_artist() {
        assert!(matches!(
            CatalogUrl::parse("https://music.apple.com/us/song/title/1440857790").unwrap(),
            CatalogUrl::Song { .. }
        ));
        let pl = CatalogUrl::parse("https://music.apple.com/us/playlist/mix/pl.u-abc123-XY").unwrap();
        assert_eq!(pl.id(), "pl.u-abc123-XY");
        assert_eq!(
            CatalogUrl::parse("https://music.apple.com/gb/music-video/clip/1234567").unwrap().kind(),
            "music-video"
        );
        assert_eq!(
            CatalogUrl::parse("https://classical.music.apple.com/de/artist/name/998877").unwrap().storefront(),
            "de"
        );
    }

    #[test]
    fn test_rejects_unknown_urls() {
        for raw in [
            "",
            "https://example.com/us/album/x/123",
            "https://music.apple.com/us/station/x/ra.123",
            "https://music.apple.com/usa/album/x/123",
            "https://music.apple.com/us/album/x/abc",
        ] {
            assert!(
                matches!(CatalogUrl::parse(raw), Err(Error::Validation(_))),
                "{raw}"
            );
        }
    }
}
