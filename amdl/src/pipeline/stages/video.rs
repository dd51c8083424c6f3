//! Music videos: standalone jobs and videos found inside collections.

use std::path::Path;

use tracing::debug;

use super::layout::{Layout, partial_path};
use super::{JobContext, StagePipeline, tag};
use crate::catalog::{Collection, MusicVideo, Track};
use crate::downloader::{FetchRequest, FetchSource};
use crate::utils::fs;
use crate::Result;

const SKIP_MESSAGE: &str = "media-user-token not set, skip MV";

impl StagePipeline {
    /// Standalone video job, reported in four coarse steps.
    pub(super) async fn run_music_video(
        &self,
        cx: &JobContext<'_>,
        storefront: &str,
        id: &str,
    ) -> Result<()> {
        let progress = cx.progress;
        progress.progress(0, 4, "prepare mv");
        progress.sub(0, None);

        if !self.settings.media_user_token_set {
            progress.info(SKIP_MESSAGE);
            progress.progress(4, 4, "mv skipped");
            progress.sub(100, None);
            return Ok(());
        }

        cx.cancel.checkpoint()?;
        let video = self.catalog.music_video(storefront, id).await?;
        progress.progress(1, 4, &format!("mv identified: {}", video.name));

        let layout = Layout::new(&self.settings.storage, cx.tier());
        let output = layout.music_video_path(&video.name, &video.id);
        if fs::file_exists(&output).await? {
            progress.info(format!("{} already exists", output.display()));
        } else {
            self.download_video(cx, &video, None, &output, true).await?;
        }

        progress.progress(4, 4, "mv done");
        progress.sub(100, None);
        Ok(())
    }

    /// A video that is one item of an album or playlist. Named like a track.
    pub(super) async fn run_collection_video(
        &self,
        cx: &JobContext<'_>,
        layout: &Layout<'_>,
        collection: &Collection,
        position: usize,
        track: &Track,
        dir: &Path,
    ) -> Result<()> {
        if !self.settings.media_user_token_set {
            cx.progress.info(format!("{}: {SKIP_MESSAGE}", track.name));
            return Ok(());
        }

        let video = self
            .catalog
            .music_video(&collection.storefront, &track.id)
            .await?;
        let output = dir.join(layout.numbered_video_name(&video.name, position));
        if fs::file_exists(&output).await? {
            cx.progress
                .info(format!("{} already exists", output.display()));
            return Ok(());
        }
        self.download_video(cx, &video, Some((collection, position)), &output, false)
            .await
    }

    async fn download_video(
        &self,
        cx: &JobContext<'_>,
        video: &MusicVideo,
        context: Option<(&Collection, usize)>,
        output: &Path,
        report_steps: bool,
    ) -> Result<()> {
        let progress = cx.progress;

        cx.cancel.checkpoint()?;
        let manifest_url = self.catalog.music_video_manifest(&video.id).await?;
        let resolved = self.resolver.resolve_video(&manifest_url).await?;
        debug!(
            job_id = %progress.job_id(),
            video = %video.id,
            height = resolved.height,
            "Resolved music video streams"
        );
        if report_steps {
            progress.progress(2, 4, "mv resolved");
        }

        let part = partial_path(output);
        self.fetch_stage(cx)
            .run(FetchRequest {
                item_id: video.id.clone(),
                source: FetchSource::Video {
                    video_url: resolved.video_url,
                    audio_url: resolved.audio_url,
                },
                output: part.clone(),
            })
            .await?;
        if report_steps {
            progress.progress(3, 4, "mv fetched");
        }

        cx.cancel.checkpoint()?;
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let thumbnail_path = output.with_file_name(format!(
            "{stem}_thumbnail.{}",
            self.settings.storage.cover_format
        ));
        let thumbnail = tag::save_cover(
            self.catalog.as_ref(),
            video.artwork_url.as_deref(),
            &thumbnail_path,
            progress,
        )
        .await;

        let request = tag::video_tags(video, context, &part, thumbnail.clone());
        let result = tag::tag_and_finalize(self.tool.as_ref(), request, output).await;

        if let Some(thumbnail) = thumbnail
            && let Err(e) = tokio::fs::remove_file(&thumbnail).await
        {
            debug!(path = %thumbnail.display(), error = %e, "Failed to remove thumbnail");
        }
        result
    }
}
