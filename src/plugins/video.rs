use async_trait::async_trait;
use std::path::Path;

use super::actions::{ActionContext, ActionOutcome, ActionReport, ActionSettings};
use super::{ExecutionResult, Plugin};
use crate::payload::{Action, Payload, PayloadSchema, RawPayload, VideoAction, VideoPayload};
use crate::tools::Toolbox;
use crate::utils;
use crate::Result;

/// Extracts audio from local video files and summarizes their speech
pub struct VideoPlugin {
    tools: Toolbox,
    settings: ActionSettings,
}

impl VideoPlugin {
    pub fn new(tools: Toolbox, settings: ActionSettings) -> Self {
        Self { tools, settings }
    }

    async fn perform(
        &self,
        action: VideoAction,
        payload: &VideoPayload,
        ctx: &ActionContext,
    ) -> Result<ActionOutcome> {
        let input = Path::new(&payload.input_path);
        utils::check_file_accessible(input)?;

        match action {
            VideoAction::Audio => {
                let output = ctx.output_path_for(input, &payload.audio_format);
                self.tools.transcoder.transcode_audio(input, &output).await?;
                Ok(ActionOutcome::File(output))
            }
            VideoAction::Summary => {
                let transcript = self.tools.speech_to_text.transcribe(input).await?;
                let summary = self
                    .tools
                    .summarizer
                    .summarize(&transcript, payload.summary_length)
                    .await?;
                Ok(ActionOutcome::Text(summary))
            }
        }
    }
}

#[async_trait]
impl Plugin for VideoPlugin {
    fn name(&self) -> &'static str {
        VideoPayload::SCHEMA.domain
    }

    fn description(&self) -> &'static str {
        "Extract the audio track of a local video or summarize its speech"
    }

    fn schema(&self) -> &'static PayloadSchema {
        &VideoPayload::SCHEMA
    }

    async fn run(&self, raw: RawPayload) -> Result<ExecutionResult> {
        let payload = VideoPayload::from_raw(raw)?;
        let ctx = ActionContext::new(&self.settings)?;

        let mut report = ActionReport::new();
        for action in payload.requested_actions() {
            let outcome = ctx.run(action.token(), self.perform(action, &payload, &ctx)).await;
            report.record(action.token(), action.output_key(), outcome);
        }

        Ok(report.into_result())
    }
}
