use anyhow::Context;
use async_trait::async_trait;

use super::actions::{ActionContext, ActionOutcome, ActionReport, ActionSettings};
use super::{ExecutionResult, Plugin};
use crate::payload::{Action, Payload, PayloadSchema, RawPayload, YoutubeAction, YoutubePayload};
use crate::tools::Toolbox;
use crate::Result;

/// Downloads and summarizes videos from YouTube
pub struct YoutubePlugin {
    tools: Toolbox,
    settings: ActionSettings,
}

impl YoutubePlugin {
    pub fn new(tools: Toolbox, settings: ActionSettings) -> Self {
        Self { tools, settings }
    }

    async fn perform(
        &self,
        action: YoutubeAction,
        payload: &YoutubePayload,
        ctx: &ActionContext,
    ) -> Result<ActionOutcome> {
        let downloader = &self.tools.downloader;
        match action {
            YoutubeAction::Video => {
                let path = downloader
                    .download_video(&payload.url, payload.max_height(), ctx.output_dir(), ctx.tag())
                    .await?;
                Ok(ActionOutcome::File(path))
            }
            YoutubeAction::Audio => {
                let path = downloader
                    .download_audio(&payload.url, &payload.audio_format, ctx.output_dir(), ctx.tag())
                    .await?;
                Ok(ActionOutcome::File(path))
            }
            YoutubeAction::Summary => {
                let transcript = self.transcript(&payload.url).await?;
                let summary = self
                    .tools
                    .summarizer
                    .summarize(&transcript, payload.summary_length)
                    .await?;
                Ok(ActionOutcome::Text(summary))
            }
        }
    }

    /// Subtitle text when the video has any, otherwise a transcription of its audio
    async fn transcript(&self, url: &str) -> Result<String> {
        let work_dir = tempfile::tempdir().context("Failed to create temporary directory")?;

        if let Some(text) = self.tools.downloader.fetch_subtitles(url, work_dir.path()).await? {
            if !text.trim().is_empty() {
                tracing::debug!("Using subtitles for {}", url);
                return Ok(text);
            }
        }

        tracing::info!("No subtitles for {}, transcribing audio", url);
        let audio = self
            .tools
            .downloader
            .download_audio(url, "wav", work_dir.path(), None)
            .await?;
        self.tools.speech_to_text.transcribe(&audio).await
    }
}

#[async_trait]
impl Plugin for YoutubePlugin {
    fn name(&self) -> &'static str {
        YoutubePayload::SCHEMA.domain
    }

    fn description(&self) -> &'static str {
        "Download a YouTube video or its audio, or summarize what is said in it"
    }

    fn schema(&self) -> &'static PayloadSchema {
        &YoutubePayload::SCHEMA
    }

    async fn run(&self, raw: RawPayload) -> Result<ExecutionResult> {
        let payload = YoutubePayload::from_raw(raw)?;
        let ctx = ActionContext::new(&self.settings)?;

        let mut report = ActionReport::new();
        for action in payload.requested_actions() {
            let outcome = ctx.run(action.token(), self.perform(action, &payload, &ctx)).await;
            report.record(action.token(), action.output_key(), outcome);
        }

        Ok(report.into_result())
    }
}
