//! Output paths rendered from the storage templates.

use std::path::{Path, PathBuf};

use manifest::QualityTier;

use crate::catalog::{Collection, CollectionKind, Track};
use crate::config::StorageConfig;
use crate::utils::filename::{limit_chars, render_component, sanitize_filename};

/// Artist name used for playlist folders when the playlist has no curator.
const PLAYLIST_ARTIST: &str = "Apple Music";

pub(crate) fn codec_name(tier: QualityTier) -> &'static str {
    match tier {
        QualityTier::Alac => "ALAC",
        QualityTier::Aac => "AAC",
        QualityTier::Atmos => "ATMOS",
    }
}

/// Space-joined markers for mastering and content rating, e.g. `[E]`.
pub(crate) fn tag_string(
    storage: &StorageConfig,
    apple_master: bool,
    content_rating: Option<&str>,
) -> String {
    let mut parts = Vec::new();
    if apple_master && !storage.apple_master_choice.is_empty() {
        parts.push(storage.apple_master_choice.as_str());
    }
    match content_rating {
        Some("explicit") if !storage.explicit_choice.is_empty() => {
            parts.push(storage.explicit_choice.as_str())
        }
        Some("clean") if !storage.clean_choice.is_empty() => {
            parts.push(storage.clean_choice.as_str())
        }
        _ => {}
    }
    parts.join(" ")
}

/// Renders directories and file names for one job.
pub(crate) struct Layout<'a> {
    storage: &'a StorageConfig,
    tier: QualityTier,
}

impl<'a> Layout<'a> {
    pub fn new(storage: &'a StorageConfig, tier: QualityTier) -> Self {
        Self { storage, tier }
    }

    fn limit(&self, name: &str) -> String {
        limit_chars(name, self.storage.limit_max)
    }

    /// `<save folder>/<artist>/<collection>`. `quality` fills `{Quality}`.
    pub fn collection_dir(&self, collection: &Collection, quality: &str) -> PathBuf {
        let mut dir = self.storage.save_folder(self.tier).clone();
        let codec = codec_name(self.tier);
        let tag = tag_string(
            self.storage,
            collection.is_apple_digital_master,
            collection.content_rating.as_deref(),
        );

        match collection.kind {
            CollectionKind::Album => {
                let artist = self.limit(&collection.artist_name);
                let artist_id = collection.artist_id.as_deref().unwrap_or_default();
                if !self.storage.artist_folder_format.is_empty() {
                    dir.push(render_component(
                        &self.storage.artist_folder_format,
                        &[
                            ("UrlArtistName", artist.as_str()),
                            ("ArtistName", artist.as_str()),
                            ("ArtistId", artist_id),
                        ],
                    ));
                }
                let name = self.limit(&collection.name);
                let release_date = collection.release_date.as_deref().unwrap_or_default();
                dir.push(render_component(
                    &self.storage.album_folder_format,
                    &[
                        ("AlbumName", name.as_str()),
                        ("AlbumId", collection.id.as_str()),
                        ("ArtistName", artist.as_str()),
                        ("ReleaseDate", release_date),
                        ("ReleaseYear", collection.release_year().unwrap_or_default()),
                        ("UPC", collection.upc.as_deref().unwrap_or_default()),
                        (
                            "RecordLabel",
                            collection.record_label.as_deref().unwrap_or_default(),
                        ),
                        ("Copyright", collection.copyright.as_deref().unwrap_or_default()),
                        ("Quality", quality),
                        ("Codec", codec),
                        ("Tag", tag.as_str()),
                    ],
                ));
            }
            CollectionKind::Playlist => {
                let artist = if collection.artist_name.trim().is_empty() {
                    PLAYLIST_ARTIST.to_string()
                } else {
                    self.limit(&collection.artist_name)
                };
                if !self.storage.artist_folder_format.is_empty() {
                    dir.push(render_component(
                        &self.storage.artist_folder_format,
                        &[
                            ("UrlArtistName", artist.as_str()),
                            ("ArtistName", artist.as_str()),
                            ("ArtistId", ""),
                        ],
                    ));
                }
                let name = self.limit(&collection.name);
                dir.push(render_component(
                    &self.storage.playlist_folder_format,
                    &[
                        ("PlaylistName", name.as_str()),
                        ("PlaylistId", collection.id.as_str()),
                        ("ArtistName", artist.as_str()),
                        ("Quality", quality),
                        ("Codec", codec),
                        ("Tag", tag.as_str()),
                    ],
                ));
            }
        }
        dir
    }

    /// File name of a track. `position` is its 1-based place in the collection.
    pub fn track_file_name(&self, track: &Track, position: usize, quality: &str) -> String {
        let tag = tag_string(
            self.storage,
            track.is_apple_digital_master,
            track.content_rating.as_deref(),
        );
        let number = format!("{position:02}");
        let disc = track.disc_number.to_string();
        let track_number = track.track_number.to_string();
        let name = self.limit(&track.name);
        let stem = render_component(
            &self.storage.song_file_format,
            &[
                ("SongId", track.id.as_str()),
                ("SongNumer", number.as_str()),
                ("SongName", name.as_str()),
                ("DiscNumber", disc.as_str()),
                ("TrackNumber", track_number.as_str()),
                ("Quality", quality),
                ("Tag", tag.as_str()),
                ("Codec", codec_name(self.tier)),
            ],
        );
        format!("{stem}.m4a")
    }

    /// Standalone music videos are named `<title> (<id>).mp4`.
    pub fn music_video_path(&self, name: &str, id: &str) -> PathBuf {
        let stem = sanitize_filename(&format!("{} ({id})", self.limit(name)));
        self.storage.mv_save_folder.join(format!("{stem}.mp4"))
    }

    /// Music videos inside a collection are numbered like tracks.
    pub fn numbered_video_name(&self, name: &str, position: usize) -> String {
        let stem = sanitize_filename(&format!("{position:02}. {}", self.limit(name)));
        format!("{stem}.mp4")
    }

    pub fn cover_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("cover.{}", self.storage.cover_format))
    }
}

/// Temporary name used while a file is being produced: `name.part.ext`.
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.part.{}", ext.to_string_lossy()),
        None => format!("{stem}.part"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TrackKind;

    fn album() -> Collection {
        Collection {
            kind: CollectionKind::Album,
            id: "1440857781".into(),
            storefront: "us".into(),
            name: "Best Of: Vol. 1".into(),
            artist_name: "AC/DC".into(),
            artist_id: Some("42".into()),
            release_date: Some("2011-03-04".into()),
            upc: None,
            record_label: None,
            copyright: None,
            artwork_url: None,
            content_rating: Some("explicit".into()),
            is_apple_digital_master: false,
            tracks: Vec::new(),
        }
    }

    fn track() -> Track {
        Track {
            id: "1".into(),
            kind: TrackKind::Song,
            name: "Intro?".into(),
            artist_name: "AC/DC".into(),
            album_name: "Best Of".into(),
            disc_number: 1,
            track_number: 3,
            content_rating: None,
            is_apple_digital_master: false,
            manifest_url: None,
            artwork_url: None,
        }
    }

    #[test]
    fn test_collection_dir_default_templates() {
        let storage = StorageConfig::default();
        let layout = Layout::new(&storage, QualityTier::Atmos);
        assert_eq!(
            layout.collection_dir(&album(), ""),
            PathBuf::from("AM-DL-Atmos downloads")
                .join("AC_DC")
                .join("Best Of_ Vol. 1")
        );
    }

    #[test]
    fn test_album_template_placeholders() {
        let mut storage = StorageConfig::default();
        storage.album_folder_format = "{ReleaseYear} - {AlbumName} [{Codec}] {Tag}".into();
        storage.artist_folder_format = String::new();
        let layout = Layout::new(&storage, QualityTier::Alac);
        assert_eq!(
            layout.collection_dir(&album(), "24B-96.0kHz"),
            PathBuf::from("AM-DL downloads").join("2011 - Best Of_ Vol. 1 [ALAC] [E]")
        );
    }

    #[test]
    fn test_playlist_uses_default_artist() {
        let storage = StorageConfig::default();
        let layout = Layout::new(&storage, QualityTier::Aac);
        let mut playlist = album();
        playlist.kind = CollectionKind::Playlist;
        playlist.artist_name = String::new();
        playlist.name = "Chill Mix".into();
        assert_eq!(
            layout.collection_dir(&playlist, ""),
            PathBuf::from("AM-DL-AAC downloads")
                .join("Apple Music")
                .join("Chill Mix")
        );
    }

    #[test]
    fn test_track_file_name() {
        let storage = StorageConfig::default();
        let layout = Layout::new(&storage, QualityTier::Alac);
        assert_eq!(layout.track_file_name(&track(), 3, ""), "03. Intro_.m4a");
    }

    #[test]
    fn test_names_are_limited() {
        let mut storage = StorageConfig::default();
        storage.limit_max = 4;
        let layout = Layout::new(&storage, QualityTier::Alac);
        assert_eq!(layout.track_file_name(&track(), 1, ""), "01. Intr.m4a");
    }

    #[test]
    fn test_music_video_path() {
        let storage = StorageConfig::default();
        let layout = Layout::new(&storage, QualityTier::Alac);
        assert_eq!(
            layout.music_video_path("Clip: Live", "123"),
            PathBuf::from("AM-DL downloads").join("Clip_ Live (123).mp4")
        );
        assert_eq!(layout.numbered_video_name("Clip", 2), "02. Clip.mp4");
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("a/01. Song.m4a")),
            PathBuf::from("a/01. Song.part.m4a")
        );
    }

    #[test]
    fn test_tag_string() {
        let mut storage = StorageConfig::default();
        storage.apple_master_choice = "[M]".into();
        assert_eq!(tag_string(&storage, true, Some("explicit")), "[M] [E]");
        assert_eq!(tag_string(&storage, false, Some("clean")), "[C]");
        assert_eq!(tag_string(&storage, false, None), "");
    }
}
