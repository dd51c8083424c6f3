//! Turns a submitted URL into the collection or video to download.

use crate::catalog::{CatalogClient, CatalogUrl, Collection};
use crate::pipeline::job::JobOptions;
use crate::pipeline::progress::ProgressReporter;
use crate::{Error, Result};

/// Which items of a collection to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ItemSelection {
    All,
    /// 1-based positions.
    Indices(Vec<u32>),
    /// One track, by catalog id.
    Single(String),
}

impl ItemSelection {
    fn from_options(options: &JobOptions, track_id: Option<String>, song_url: bool) -> Self {
        match track_id {
            Some(id) if song_url || options.song_only => ItemSelection::Single(id),
            _ if !options.tracks.is_empty() => ItemSelection::Indices(options.tracks.clone()),
            _ => ItemSelection::All,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Target {
    Collection {
        collection: Collection,
        selection: ItemSelection,
    },
    MusicVideo {
        storefront: String,
        id: String,
    },
}

/// Classify `options.url` and fetch the collection metadata it points at.
pub(crate) async fn identify(
    catalog: &dyn CatalogClient,
    options: &JobOptions,
    progress: &ProgressReporter,
) -> Result<Target> {
    match CatalogUrl::parse(&options.url)? {
        CatalogUrl::Song { storefront, id } => {
            let album_id = catalog
                .song_album_id(&storefront, &id)
                .await
                .inspect_err(|e| progress.error(format!("Failed to get Song info: {e}")))?;
            progress.info("Type: Album");
            let collection = catalog.album(&storefront, &album_id).await?;
            Ok(Target::Collection {
                collection,
                selection: ItemSelection::Single(id),
            })
        }
        CatalogUrl::Album {
            storefront,
            id,
            track_id,
        } => {
            progress.info("Type: Album");
            let collection = catalog.album(&storefront, &id).await?;
            Ok(Target::Collection {
                selection: ItemSelection::from_options(options, track_id, false),
                collection,
            })
        }
        CatalogUrl::Playlist { storefront, id } => {
            progress.info("Type: Playlist");
            let collection = catalog.playlist(&storefront, &id).await?;
            Ok(Target::Collection {
                selection: ItemSelection::from_options(options, None, false),
                collection,
            })
        }
        CatalogUrl::MusicVideo { storefront, id } => {
            progress.info("Type: Music Video");
            Ok(Target::MusicVideo { storefront, id })
        }
        CatalogUrl::Artist { .. } => Err(Error::validation(
            "artist URLs cannot be downloaded directly, submit the albums instead",
        )),
    }
}

/// Items to process as `(1-based position, item)`, in collection order.
///
/// Returns `None` when a single track was requested and the collection does
/// not contain it.
pub(crate) fn select_items<'a, T>(
    items: &'a [T],
    selection: &ItemSelection,
    id_of: impl Fn(&T) -> &str,
) -> Option<Vec<(usize, &'a T)>> {
    let numbered = items.iter().enumerate().map(|(i, item)| (i + 1, item));
    match selection {
        ItemSelection::All => Some(numbered.collect()),
        ItemSelection::Indices(indices) => Some(
            numbered
                .filter(|(pos, _)| indices.iter().any(|&i| i as usize == *pos))
                .collect(),
        ),
        ItemSelection::Single(id) => {
            let found: Vec<_> = numbered.filter(|(_, item)| id_of(item) == id).take(1).collect();
            (!found.is_empty()).then_some(found)
        }
    }
}
