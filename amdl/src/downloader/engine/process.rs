//! [`ExternalTool`] implementation that shells out to configured programs.

use async_trait::async_trait;
use process_utils::{run_captured, tokio_command};
use tracing::{debug, warn};

use super::traits::{ExternalTool, FetchRequest, FetchSource, TagRequest};
use crate::config::{CatalogConfig, MIN_MEDIA_USER_TOKEN_LEN, ToolsConfig};
use crate::{Error, Result};

pub struct ProcessTool {
    tools: ToolsConfig,
    authorization_token: String,
    media_user_token: String,
}

impl ProcessTool {
    pub fn new(tools: ToolsConfig, catalog: &CatalogConfig) -> Self {
        Self {
            tools,
            authorization_token: catalog.bearer_token().to_string(),
            media_user_token: catalog.media_user_token.trim().to_string(),
        }
    }

    fn fetch_command(&self, request: &FetchRequest) -> (&str, Vec<String>) {
        let output = request.output.to_string_lossy();
        let (program, template, url, video_url, audio_url) = match &request.source {
            FetchSource::Stream { url } => {
                (&self.tools.fetch_program, &self.tools.fetch_args, url.as_str(), "", "")
            }
            FetchSource::Legacy => (&self.tools.legacy_program, &self.tools.legacy_args, "", "", ""),
            FetchSource::Video {
                video_url,
                audio_url,
            } => (
                &self.tools.video_program,
                &self.tools.video_args,
                "",
                video_url.as_str(),
                audio_url.as_str(),
            ),
        };

        let values = [
            ("{id}", request.item_id.as_str()),
            ("{url}", url),
            ("{output}", &*output),
            ("{video_url}", video_url),
            ("{audio_url}", audio_url),
            ("{media_user_token}", self.media_user_token.as_str()),
            ("{authorization_token}", self.authorization_token.as_str()),
        ];
        (program.as_str(), render_args(template, &values))
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<()> {
        debug!(program, args = args.len(), "Running external tool");
        let mut cmd = tokio_command(program);
        cmd.args(args);
        let output = run_captured(&mut cmd)
            .await
            .map_err(|e| Error::tool(format!("failed to start {program}: {e}")))?;

        if output.success() {
            return Ok(());
        }

        let code = output
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        warn!(program, code = %code, stderr = %output.stderr_tail, "External tool failed");
        Err(Error::tool(format!(
            "{program} exited with {code}: {}",
            output.stderr_tail.trim()
        )))
    }
}

/// Substitute `{token}` placeholders in every argument.
fn render_args(template: &[String], values: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            values
                .iter()
                .fold(arg.clone(), |acc, (token, value)| acc.replace(token, value))
        })
        .collect()
}

/// Stands in for `:` inside tag values, which `-itags` would read as a separator.
const TAG_COLON: char = '\u{2236}';

/// MP4Box `-itags` argument: `key=value` pairs joined with `:`.
fn itags_argument(request: &TagRequest) -> String {
    let mut parts: Vec<String> = request
        .tags
        .iter()
        .map(|(k, v)| format!("{k}={}", v.replace(':', &TAG_COLON.to_string())))
        .collect();
    if let Some(cover) = &request.cover {
        parts.push(format!("cover={}", cover.display()));
    }
    parts.join(":")
}

#[async_trait]
impl ExternalTool for ProcessTool {
    async fn fetch(&self, request: &FetchRequest) -> Result<()> {
        let legacy = matches!(request.source, FetchSource::Legacy);
        if legacy && self.media_user_token.len() <= MIN_MEDIA_USER_TOKEN_LEN {
            return Err(Error::unavailable("Invalid media-user-token"));
        }
        let (program, args) = self.fetch_command(request);
        match self.run(program, &args).await {
            // The legacy fetcher reports region or licence gaps this way.
            Err(Error::Tool(msg)) if legacy && msg.contains("Unavailable") => {
                Err(Error::unavailable("Unavailable"))
            }
            other => other,
        }
    }

    async fn tag(&self, request: &TagRequest) -> Result<()> {
        let args = vec![
            "-itags".to_string(),
            itags_argument(request),
            request.path.to_string_lossy().into_owned(),
        ];
        self.run(&self.tools.tag_program, &args).await
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn tool() -> ProcessTool {
        let mut catalog = CatalogConfig::default();
        catalog.authorization_token = "Bearer dev".to_string();
        catalog.media_user_token = "m".repeat(60);
        ProcessTool::new(ToolsConfig::default(), &catalog)
    }

    #[test]
    fn test_stream_fetch_command() {
        let request = FetchRequest {
            item_id: "123".into(),
            source: FetchSource::Stream {
                url: "https://cdn/a.m3u8".into(),
            },
            output: PathBuf::from("out/01. Song.m4a.part"),
        };
        let tool = tool();
        let (program, args) = tool.fetch_command(&request);
        assert_eq!(program, "amdl-fetch");
        assert_eq!(
            args,
            [
                "--id",
                "123",
                "--url",
                "https://cdn/a.m3u8",
                "--output",
                "out/01. Song.m4a.part"
            ]
        );
    }

    #[test]
    fn test_legacy_command_carries_tokens() {
        let request = FetchRequest {
            item_id: "9".into(),
            source: FetchSource::Legacy,
            output: PathBuf::from("x.m4a"),
        };
        let tool = tool();
        let (program, args) = tool.fetch_command(&request);
        assert_eq!(program, "amdl-legacy");
        assert!(args.contains(&"dev".to_string()));
        assert!(args.contains(&"m".repeat(60)));
    }

    #[test]
    fn test_itags_argument() {
        let request = TagRequest::new("a.m4a")
            .tag("tool", "")
            .tag("artist", "Band")
            .with_cover(Some(PathBuf::from("cover.jpg")));
        assert_eq!(itags_argument(&request), "tool=:artist=Band:cover=cover.jpg");
    }

    #[test]
    fn test_itags_values_cannot_split_pairs() {
        let request = TagRequest::new("a.m4a")
            .tag("album", "Live: 2020")
            .tag("title", "a:b=c");
        let arg = itags_argument(&request);
        assert_eq!(arg, "album=Live\u{2236} 2020:title=a\u{2236}b=c");
        assert_eq!(arg.split(':').count(), 2);
    }

    #[tokio::test]
    async fn test_legacy_fetch_requires_token() {
        let tool = ProcessTool::new(ToolsConfig::default(), &CatalogConfig::default());
        let request = FetchRequest {
            item_id: "9".into(),
            source: FetchSource::Legacy,
            output: PathBuf::from("x.m4a"),
        };
        assert!(matches!(
            tool.fetch(&request).await,
            Err(Error::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_error() {
        let mut tools = ToolsConfig::default();
        tools.tag_program = "amdl-definitely-not-installed".to_string();
        let tool = ProcessTool::new(tools, &CatalogConfig::default());
        let err = tool.tag(&TagRequest::new("a.m4a")).await.unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
    }
}
