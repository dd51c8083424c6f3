//! Produces the decrypted media file through the external fetch tool.

use std::path::Path;

use tracing::debug;

use super::resolve::Plan;
use crate::downloader::{ExternalTool, FetchRequest, FetchSource};
use crate::pipeline::cancel::CancelCheck;
use crate::pipeline::progress::ProgressReporter;
use crate::utils::fs;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    Fetched,
    /// The final file was already on disk. Nothing was downloaded.
    AlreadyExists,
}

pub(crate) struct FetchStage<'a> {
    pub tool: &'a dyn ExternalTool,
    pub cancel: &'a CancelCheck,
    pub progress: &'a ProgressReporter,
    pub media_user_token_set: bool,
}

impl FetchStage<'_> {
    /// Fetch `item_id` into `part`, unless `final_path` already exists.
    pub async fn fetch(
        &self,
        item_id: &str,
        plan: &Plan,
        final_path: &Path,
        part: &Path,
    ) -> Result<FetchOutcome> {
        if fs::file_exists(final_path).await? {
            self.progress
                .info(format!("{} already exists", final_path.display()));
            return Ok(FetchOutcome::AlreadyExists);
        }

        let source = match plan {
            Plan::Stream(stream) => FetchSource::Stream {
                url: stream.url.clone(),
            },
            Plan::Legacy if !self.media_user_token_set => {
                return Err(Error::unavailable("Invalid media-user-token"));
            }
            Plan::Legacy => FetchSource::Legacy,
        };

        self.run(FetchRequest {
            item_id: item_id.to_string(),
            source,
            output: part.to_path_buf(),
        })
        .await?;
        Ok(FetchOutcome::Fetched)
    }

    /// Run one fetch request with the `10 → 90` sub-progress bracket.
    pub async fn run(&self, request: FetchRequest) -> Result<()> {
        self.cancel.checkpoint()?;
        fs::ensure_parent_dir(&request.output).await?;
        self.progress.sub(10, None);
        debug!(
            job_id = %self.progress.job_id(),
            item = %request.item_id,
            output = %request.output.display(),
            "Fetching"
        );
        self.tool.fetch(&request).await?;
        self.progress.sub(90, None);
        Ok(())
    }
}
