use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;

use super::actions::{ActionContext, ActionOutcome, ActionReport, ActionSettings};
use super::{ExecutionResult, Plugin};
use crate::payload::{Action, Payload, PayloadSchema, RawPayload, TextAction, TextPayload};
use crate::tools::Toolbox;
use crate::Result;

/// Summaries, speech and rendered documents for plain-text files
pub struct TextPlugin {
    tools: Toolbox,
    settings: ActionSettings,
}

impl TextPlugin {
    pub fn new(tools: Toolbox, settings: ActionSettings) -> Self {
        Self { tools, settings }
    }

    async fn perform(
        &self,
        action: TextAction,
        payload: &TextPayload,
        input: &Path,
        text: &str,
        ctx: &ActionContext,
    ) -> Result<ActionOutcome> {
        match action {
            TextAction::Summarize => {
                let summary = self.tools.summarizer.summarize(text, payload.summary_length).await?;
                Ok(ActionOutcome::Text(summary))
            }
            TextAction::Tts => {
                let output = ctx.output_path_for(input, &payload.tts_format);
                self.tools
                    .synthesizer
                    .synthesize(text, &payload.tts_format, &output)
                    .await?;
                Ok(ActionOutcome::File(output))
            }
            TextAction::ToPdf => {
                let output = ctx.output_path_for(input, "pdf");
                self.tools.renderer.text_to_pdf(text, &output).await?;
                Ok(ActionOutcome::File(output))
            }
            TextAction::ToImage => {
                let output = ctx.output_path_for(input, "png");
                self.tools.renderer.text_to_image(text, &output).await?;
                Ok(ActionOutcome::File(output))
            }
        }
    }
}

/// Empty files are allowed; the summarizer answers those with a placeholder
async fn read_text(path: &Path) -> Result<String> {
    if !path.is_file() {
        anyhow::bail!("File does not exist: {}", path.display());
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {} as UTF-8 text", path.display()))
}

#[async_trait]
impl Plugin for TextPlugin {
    fn name(&self) -> &'static str {
        TextPayload::SCHEMA.domain
    }

    fn description(&self) -> &'static str {
        "Summarize a text file, read it aloud or render it as a PDF or image"
    }

    fn schema(&self) -> &'static PayloadSchema {
        &TextPayload::SCHEMA
    }

    async fn run(&self, raw: RawPayload) -> Result<ExecutionResult> {
        let payload = TextPayload::from_raw(raw)?;
        let ctx = ActionContext::new(&self.settings)?;
        let actions = payload.requested_actions();
        if actions.is_empty() {
            return Ok(ActionReport::new().into_result());
        }

        let input = Path::new(&payload.input_path);
        let mut report = ActionReport::new();

        // every action needs the file contents; a read failure fails them all
        let text = match read_text(input).await {
            Ok(text) => text,
            Err(e) => {
                let reason = format!("{:#}", e);
                for action in actions {
                    report.record(action.token(), action.output_key(), ActionOutcome::Failed(reason.clone()));
                }
                return Ok(report.into_result());
            }
        };

        for action in actions {
            let outcome = ctx
                .run(action.token(), self.perform(action, &payload, input, &text, &ctx))
                .await;
            report.record(action.token(), action.output_key(), outcome);
        }

        Ok(report.into_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SummaryLength;
    use crate::tools::openai::EMPTY_TRANSCRIPT;
    use crate::tools::testing::MockTools;
    use mockall::predicate::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn plugin(tools: MockTools, out: &Path) -> TextPlugin {
        TextPlugin::new(
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
    async fn test_summarize_and_tts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, "Meeting notes about the release.").unwrap();

        let mut tools = MockTools::new();
        tools
            .summarizer
            .expect_summarize()
            .with(eq("Meeting notes about the release."), eq(SummaryLength::Short))
            .times(1)
            .returning(|_, _| Ok("Release meeting.".to_string()));
        tools
            .synthesizer
            .expect_synthesize()
            .withf(|text, format, output| {
                text.starts_with("Meeting") && format == "mp3" && output.extension().is_some_and(|e| e == "mp3")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let result = plugin(tools, dir.path())
            .run(raw(json!({
                "input_path": input.to_str().unwrap(),
                "actions": ["summarize", "tts"],
            })))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.outputs.keys().collect::<Vec<_>>(), vec!["audio", "summary"]);
        assert_eq!(result.output("summary"), Some("Release meeting."));
        assert_eq!(PathBuf::from(result.output("audio").unwrap()), dir.path().join("notes.mp3"));
    }

    #[tokio::test]
    async fn test_empty_file_summary_uses_summarizer_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.txt");
        std::fs::write(&input, "").unwrap();

        let mut tools = MockTools::new();
        tools
            .summarizer
            .expect_summarize()
            .returning(|_, _| Ok(EMPTY_TRANSCRIPT.to_string()));

        let result = plugin(tools, dir.path())
            .run(raw(json!({"input_path": input.to_str().unwrap(), "actions": ["summarize"]})))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output("summary"), Some(EMPTY_TRANSCRIPT));
    }

    #[tokio::test]
    async fn test_render_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("poem.txt");
        std::fs::write(&input, "roses\nviolets").unwrap();

        let mut tools = MockTools::new();
        tools.renderer.expect_text_to_pdf().times(1).returning(|_, _| Ok(()));
        tools.renderer.expect_text_to_image().times(1).returning(|_, _| Ok(()));

        let result = plugin(tools, dir.path())
            .run(raw(json!({"input_path": input.to_str().unwrap(), "actions": ["to-image", "to-pdf"]})))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output("pdf").unwrap().ends_with("poem.pdf"));
        assert!(result.output("image").unwrap().ends_with("poem.png"));
    }

    #[tokio::test]
    async fn test_unreadable_file_fails_every_action() {
        let dir = tempfile::tempdir().unwrap();
        let mut tools = MockTools::new();
        tools.summarizer.expect_summarize().never();
        tools.renderer.expect_text_to_pdf().never();

        let result = plugin(tools, dir.path())
            .run(raw(json!({
                "input_path": dir.path().join("gone.txt").to_str().unwrap(),
                "actions": ["summarize", "to-pdf"],
            })))
            .await
            .unwrap();

        assert!(!result.success);
        let error = result.error().unwrap();
        assert!(error.starts_with("summarize: "), "{error}");
        assert!(error.contains("; to-pdf: "), "{error}");
    }
}
