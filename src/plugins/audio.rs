use async_trait::async_trait;
use std::path::Path;

use super::actions::{ActionContext, ActionOutcome, ActionReport, ActionSettings};
use super::{ExecutionResult, Plugin};
use crate::payload::{Action, AudioAction, AudioPayload, Payload, PayloadSchema, RawPayload};
use crate::tools::Toolbox;
use crate::utils;
use crate::Result;

/// Converts local audio files and summarizes their speech
pub struct AudioPlugin {
    tools: Toolbox,
    settings: ActionSettings,
}

impl AudioPlugin {
    pub fn new(tools: Toolbox, settings: ActionSettings) -> Self {
        Self { tools, settings }
    }

    async fn perform(
        &self,
        action: AudioAction,
        payload: &AudioPayload,
        ctx: &ActionContext,
    ) -> Result<ActionOutcome> {
        let input = Path::new(&payload.input_path);
        utils::check_file_accessible(input)?;

        match action {
            AudioAction::Convert => {
                let output = ctx.output_path_for(input, &payload.target_format);
                self.tools.transcoder.transcode_audio(input, &output).await?;
                Ok(ActionOutcome::File(output))
            }
            AudioAction::Summary => {
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
impl Plugin for AudioPlugin {
    fn name(&self) -> &'static str {
        AudioPayload::SCHEMA.domain
    }

    fn description(&self) -> &'static str {
        "Convert a local audio file or summarize its speech"
    }

    fn schema(&self) -> &'static PayloadSchema {
        &AudioPayload::SCHEMA
    }

    async fn run(&self, raw: RawPayload) -> Result<ExecutionResult> {
        let payload = AudioPayload::from_raw(raw)?;
        let ctx = ActionContext::new(&self.settings)?;

        let mut report = ActionReport::new();
        for action in payload.requested_actions() {
            let outcome = ctx.run(action.token(), self.perform(action, &payload, &ctx)).await;
            report.record(action.token(), action.output_key(), outcome);
        }

        Ok(report.into_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SummaryLength;
    use crate::tools::testing::MockTools;
    use mockall::predicate::*;
    use serde_json::json;
    use std::path::PathBuf;

    struct Fixture {
        dir: tempfile::TempDir,
        input: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        std::fs::write(&input, b"RIFF....WAVEfmt ").unwrap();
        Fixture { dir, input }
    }

    fn plugin(tools: MockTools, out: &Path) -> AudioPlugin {
        AudioPlugin::new(
            tools.into_toolbox(),
            ActionSettings {
                output_dir: Some(out.to_path_buf()),
                unique_outputs: false,
                timeout: None,
            },
        )
    }

    fn raw(value: serde_json::Value) -> RawPayload {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_convert_writes_target_format() {
        let fx = fixture();
        let out = fx.dir.path().join("out");

        let mut tools = MockTools::new();
        tools
            .transcoder
            .expect_transcode_audio()
            .times(1)
            .returning(|_, output| {
                std::fs::write(output, b"ID3").unwrap();
                Ok(())
            });

        let result = plugin(tools, &out)
            .run(raw(json!({
                "input_path": fx.input.to_str().unwrap(),
                "actions": ["convert"],
                "target_format": "mp3",
            })))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.outputs.len(), 1);
        let converted = PathBuf::from(result.output("converted").unwrap());
        assert!(converted.is_absolute());
        assert_eq!(converted.extension().unwrap(), "mp3");
        assert_eq!(converted, out.join("in.mp3"));
    }

    #[tokio::test]
    async fn test_summary_only_skips_conversion() {
        let fx = fixture();
        let input = fx.input.clone();

        let mut tools = MockTools::new();
        tools.transcoder.expect_transcode_audio().never();
        tools
            .speech_to_text
            .expect_transcribe()
            .withf(move |path| path == input.as_path())
            .times(1)
            .returning(|_| Ok("we talked about rust".to_string()));
        tools
            .summarizer
            .expect_summarize()
            .with(eq("we talked about rust"), eq(SummaryLength::Detailed))
            .times(1)
            .returning(|_, _| Ok("Rust.".to_string()));

        let result = plugin(tools, fx.dir.path())
            .run(raw(json!({
                "input_path": fx.input.to_str().unwrap(),
                "actions": ["summary"],
                "summary_length": "detailed",
            })))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output("summary"), Some("Rust."));
        assert_eq!(result.output("converted"), None);
    }

    #[tokio::test]
    async fn test_missing_input_fails_without_tools() {
        let dir = tempfile::tempdir().unwrap();
        let mut tools = MockTools::new();
        tools.transcoder.expect_transcode_audio().never();

        let result = plugin(tools, dir.path())
            .run(raw(json!({
                "input_path": dir.path().join("missing.wav").to_str().unwrap(),
                "actions": ["convert"],
            })))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error().unwrap().starts_with("convert: "));
    }

    #[tokio::test]
    async fn test_failed_summary_keeps_conversion() {
        let fx = fixture();

        let mut tools = MockTools::new();
        tools.transcoder.expect_transcode_audio().returning(|_, _| Ok(()));
        tools
            .speech_to_text
            .expect_transcribe()
            .returning(|_| Err(anyhow::anyhow!("whisper crashed")));
        tools.summarizer.expect_summarize().never();

        let result = plugin(tools, fx.dir.path())
            .run(raw(json!({
                "input_path": fx.input.to_str().unwrap(),
                "actions": ["convert", "summary"],
                "target_format": "ogg",
            })))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.output("converted").unwrap().ends_with("in.ogg"));
        assert_eq!(result.error(), Some("summary: whisper crashed"));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = plugin(MockTools::new(), dir.path())
            .run(raw(json!({"actions": ["convert"]})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("input_path"));
    }
}
