//! Metadata tagging and moving finished files into place.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::catalog::{CatalogClient, Collection, CollectionKind, MusicVideo, Track};
use crate::downloader::{ExternalTool, TagRequest};
use crate::pipeline::progress::ProgressReporter;
use crate::utils::fs;
use crate::Result;

/// Album artist used for playlists without a curator name.
const PLAYLIST_ALBUM_ARTIST: &str = "Apple Music";

/// Tags written into an audio track.
pub(crate) fn track_tags(
    collection: &Collection,
    track: &Track,
    position: usize,
    path: &Path,
    cover: Option<PathBuf>,
) -> TagRequest {
    let total = collection.tracks.len();
    let request = TagRequest::new(path)
        .tag("tool", "")
        .tag("artist", &track.artist_name)
        .tag("title", &track.name);

    let request = match collection.kind {
        CollectionKind::Album => request
            .tag("album", &track.album_name)
            .tag("album_artist", &collection.artist_name)
            .tag("tracknum", format!("{}/{total}", track.track_number))
            .tag("disk", track.disc_number.to_string()),
        CollectionKind::Playlist => {
            let album_artist = if collection.artist_name.trim().is_empty() {
                PLAYLIST_ALBUM_ARTIST
            } else {
                collection.artist_name.as_str()
            };
            request
                .tag("album", &collection.name)
                .tag("album_artist", album_artist)
                .tag("tracknum", format!("{position}/{total}"))
                .tag("disk", "1/1")
        }
    };

    let request = match collection.release_date.as_deref() {
        Some(date) if collection.kind == CollectionKind::Album => request.tag("created", date),
        _ => request,
    };
    request.with_cover(cover)
}

/// Tags written into a music video. `context` is the enclosing collection
/// and the video's 1-based position in it.
pub(crate) fn video_tags(
    video: &MusicVideo,
    context: Option<(&Collection, usize)>,
    path: &Path,
    cover: Option<PathBuf>,
) -> TagRequest {
    let rating = match video.content_rating.as_deref() {
        Some("explicit") => "1",
        Some("clean") => "2",
        _ => "0",
    };
    let mut request = TagRequest::new(path)
        .tag("tool", "")
        .tag("artist", &video.artist_name)
        .tag("title", &video.name);
    if let Some(genre) = &video.genre {
        request = request.tag("genre", genre);
    }
    if let Some(date) = &video.release_date {
        request = request.tag("created", date);
    }
    if let Some(isrc) = &video.isrc {
        request = request.tag("ISRC", isrc);
    }
    request = request.tag("rating", rating);

    request = match context {
        Some((collection, position)) => {
            let total = collection.tracks.len();
            let (album, disk, album_artist) = match collection.kind {
                CollectionKind::Playlist => (
                    collection.name.clone(),
                    "1/1".to_string(),
                    if collection.artist_name.trim().is_empty() {
                        PLAYLIST_ALBUM_ARTIST.to_string()
                    } else {
                        collection.artist_name.clone()
                    },
                ),
                CollectionKind::Album => (
                    collection.name.clone(),
                    video.disc_number.to_string(),
                    collection.artist_name.clone(),
                ),
            };
            request
                .tag("album", album)
                .tag("disk", disk)
                .tag("track", position.to_string())
                .tag("tracknum", format!("{position}/{total}"))
                .tag("album_artist", album_artist)
        }
        None => match &video.album_name {
            Some(album) => request
                .tag("album", album)
                .tag("disk", video.disc_number.to_string())
                .tag("track", video.track_number.to_string())
                .tag("tracknum", video.track_number.to_string()),
            None => request,
        },
    };
    request
        .tag("performer", &video.artist_name)
        .with_cover(cover)
}

/// Save artwork to `dest` unless it is already there. Failures are logged
/// and yield `None`.
pub(crate) async fn save_cover(
    catalog: &dyn CatalogClient,
    template: Option<&str>,
    dest: &Path,
    progress: &ProgressReporter,
) -> Option<PathBuf> {
    let template = template.filter(|t| !t.is_empty())?;
    match fs::file_exists(dest).await {
        Ok(true) => return Some(dest.to_path_buf()),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "Failed to check cover"),
    }
    match catalog.download_artwork(template, dest).await {
        Ok(()) => Some(dest.to_path_buf()),
        Err(e) => {
            warn!(job_id = %progress.job_id(), path = %dest.display(), error = %e, "Failed to write cover");
            progress.warn(format!("Failed to write cover: {e}"));
            None
        }
    }
}

/// Tag the partial file and move it to its final name.
pub(crate) async fn tag_and_finalize(
    tool: &dyn ExternalTool,
    request: TagRequest,
    final_path: &Path,
) -> Result<()> {
    tool.tag(&request).await?;
    fs::rename(&request.path, final_path).await
}
