//! The per-job stage pipeline: identify, resolve, fetch, tag.
//!
//! Each claimed job runs through [`StagePipeline`], which drives the stages
//! for every selected item of a collection (or for a single music video)
//! under the retry controller. Cancellation is observed before every stage.

mod fetch;
mod identify;
mod layout;
mod resolve;
mod tag;
mod video;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use manifest::{Ceilings, QualityTier};
use tracing::{debug, info, warn};

use self::fetch::{FetchOutcome, FetchStage};
use self::identify::{ItemSelection, Target};
use self::layout::{Layout, partial_path};
use self::resolve::{LEGACY_QUALITY, atmos_label};
use super::cancel::CancelCheck;
use super::job::JobOptions;
use super::progress::{ProgressReporter, ProgressSink};
use super::registry::ClaimedJob;
use super::retry::RetryController;
use super::worker_pool::JobRunner;
use crate::catalog::{CatalogClient, Collection, CollectionKind, Track, TrackKind};
use crate::config::{AppConfig, StorageConfig};
use crate::downloader::{ExternalTool, StreamResolver};
use crate::utils::fs;
use crate::{Error, Result};

/// The parts of the configuration the stages read.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub storage: StorageConfig,
    pub ceilings: Ceilings,
    /// Whether a usable media-user token is configured.
    pub media_user_token_set: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            storage: config.storage.clone(),
            ceilings: config.ceilings,
            media_user_token_set: config.catalog.has_media_user_token(),
        }
    }
}

/// Borrowed per-job state handed to the stages.
struct JobContext<'a> {
    options: &'a JobOptions,
    cancel: &'a CancelCheck,
    progress: &'a ProgressReporter,
}

impl JobContext<'_> {
    fn tier(&self) -> QualityTier {
        self.options.quality
    }
}

pub struct StagePipeline {
    catalog: Arc<dyn CatalogClient>,
    resolver: Arc<dyn StreamResolver>,
    tool: Arc<dyn ExternalTool>,
    settings: PipelineSettings,
    retry: RetryController,
    sink: Arc<dyn ProgressSink>,
}

impl StagePipeline {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        resolver: Arc<dyn StreamResolver>,
        tool: Arc<dyn ExternalTool>,
        settings: PipelineSettings,
        retry: RetryController,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            catalog,
            resolver,
            tool,
            settings,
            retry,
            sink,
        }
    }

    fn fetch_stage<'a>(&'a self, cx: &'a JobContext<'_>) -> FetchStage<'a> {
        FetchStage {
            tool: self.tool.as_ref(),
            cancel: cx.cancel,
            progress: cx.progress,
            media_user_token_set: self.settings.media_user_token_set,
        }
    }

    /// One attempt at the whole job.
    async fn run_once(&self, job: &ClaimedJob, progress: &ProgressReporter) -> Result<()> {
        let cx = JobContext {
            options: &job.options,
            cancel: &job.cancel,
            progress,
        };

        cx.cancel.checkpoint()?;
        match identify::identify(self.catalog.as_ref(), cx.options, progress).await? {
            Target::MusicVideo { storefront, id } => {
                self.run_music_video(&cx, &storefront, &id).await
            }
            Target::Collection {
                collection,
                selection,
            } => self.run_collection(&cx, &collection, &selection).await,
        }
    }

    async fn run_collection(
        &self,
        cx: &JobContext<'_>,
        collection: &Collection,
        selection: &ItemSelection,
    ) -> Result<()> {
        let progress = cx.progress;
        if collection.tracks.is_empty() {
            progress.progress(0, 1, "no tracks");
            return Ok(());
        }

        let single = matches!(selection, ItemSelection::Single(_));
        if single {
            progress.progress(0, 1, "start single track");
        }
        let Some(items) = identify::select_items(&collection.tracks, selection, |t| t.id.as_str())
        else {
            progress.progress(1, 1, "single track not found");
            return Ok(());
        };
        if items.is_empty() {
            progress.progress(0, 1, "no tracks");
            return Ok(());
        }

        let total = items.len() as u32;
        let layout = Layout::new(&self.settings.storage, cx.tier());
        let quality = self.folder_quality(cx, collection, &items).await;
        let dir = layout.collection_dir(collection, &quality);
        fs::ensure_dir_all(&dir).await?;
        info!(
            job_id = %progress.job_id(),
            collection = %collection.id,
            items = total,
            dir = %dir.display(),
            "Downloading collection"
        );

        cx.cancel.checkpoint()?;
        let cover = tag::save_cover(
            self.catalog.as_ref(),
            collection.artwork_url.as_deref(),
            &layout.cover_path(&dir),
            progress,
        )
        .await
        .filter(|_| self.settings.storage.embed_cover);

        if !single {
            let start = match collection.kind {
                CollectionKind::Album => "start album",
                CollectionKind::Playlist => "start playlist",
            };
            progress.progress(0, total, start);
        }

        let mut failures = Vec::new();
        for (i, (position, track)) in items.iter().enumerate() {
            cx.cancel.checkpoint()?;
            progress.sub(0, Some(track.name.as_str()));

            let result = match track.kind {
                TrackKind::Song => {
                    self.run_track(cx, &layout, collection, *position, track, &dir, cover.clone())
                        .await
                }
                TrackKind::MusicVideo => {
                    self.run_collection_video(cx, &layout, collection, *position, track, &dir)
                        .await
                }
            };
            match result {
                Ok(()) => {}
                Err(Error::Canceled) => return Err(Error::Canceled),
                Err(e) => {
                    warn!(job_id = %progress.job_id(), track = %track.id, error = %e, "Item failed");
                    progress.error(format!("{}: {e}", track.name));
                    failures.push(e);
                }
            }

            let done = i as u32 + 1;
            if single {
                progress.progress(1, 1, &format!("done: {}", track.name));
            } else {
                progress.progress(done, total, &format!("done track {done}/{total}"));
            }
            progress.sub(100, None);
        }

        summarize_failures(failures, total, single)
    }

    async fn run_track(
        &self,
        cx: &JobContext<'_>,
        layout: &Layout<'_>,
        collection: &Collection,
        position: usize,
        track: &Track,
        dir: &Path,
        cover: Option<PathBuf>,
    ) -> Result<()> {
        let plan = resolve::plan_track(self.resolver.as_ref(), track, cx.tier(), cx.progress).await?;
        let quality = plan.quality_label(cx.tier(), &self.settings.ceilings);
        let final_path = dir.join(layout.track_file_name(track, position, &quality));
        let part = partial_path(&final_path);

        cx.cancel.checkpoint()?;
        let outcome = self
            .fetch_stage(cx)
            .fetch(&track.id, &plan, &final_path, &part)
            .await?;
        if outcome == FetchOutcome::AlreadyExists {
            return Ok(());
        }

        cx.cancel.checkpoint()?;
        let request = tag::track_tags(collection, track, position, &part, cover);
        tag::tag_and_finalize(self.tool.as_ref(), request, &final_path).await?;
        debug!(job_id = %cx.progress.job_id(), path = %final_path.display(), "Track finished");
        Ok(())
    }

    /// Value of `{Quality}` in the collection folder name.
    async fn folder_quality(
        &self,
        cx: &JobContext<'_>,
        collection: &Collection,
        items: &[(usize, &Track)],
    ) -> String {
        let storage = &self.settings.storage;
        let template = match collection.kind {
            CollectionKind::Album => &storage.album_folder_format,
            CollectionKind::Playlist => &storage.playlist_folder_format,
        };
        if !template.contains("{Quality}") {
            return String::new();
        }
        if cx.tier() == QualityTier::Atmos {
            return atmos_label(&self.settings.ceilings);
        }

        let manifest_url = items
            .iter()
            .filter(|(_, t)| t.kind == TrackKind::Song)
            .find_map(|(_, t)| t.manifest_url.as_deref());
        let Some(manifest_url) = manifest_url else {
            return LEGACY_QUALITY.to_string();
        };
        match self.resolver.resolve_audio(manifest_url, cx.tier()).await {
            Ok(stream) => stream.quality_label.replace(' ', ""),
            Err(e) => {
                warn!(job_id = %cx.progress.job_id(), error = %e, "Failed to get folder quality");
                cx.progress.warn(format!("Failed to extract quality from manifest: {e}"));
                String::new()
            }
        }
    }
}

/// Fold per-item failures into the job result. Failures that a retry could
/// fix keep the job retryable.
fn summarize_failures(mut failures: Vec<Error>, total: u32, single: bool) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    if single && failures.len() == 1 {
        return Err(failures.remove(0));
    }
    let message = format!("{} of {total} items failed", failures.len());
    if failures.iter().any(Error::is_retryable) {
        Err(Error::Other(message))
    } else {
        Err(Error::unavailable(message))
    }
}

#[async_trait]
impl JobRunner for StagePipeline {
    async fn run(&self, job: ClaimedJob) -> Result<()> {
        let progress = ProgressReporter::new(job.id.clone(), self.sink.clone());
        debug!(job_id = %job.id, url = %job.options.url, quality = %job.options.quality, "Running job");
        self.retry
            .run(job.options.max_retries, &job.cancel, &progress, |_| {
                self.run_once(&job, &progress)
            })
            .await
    }
}
