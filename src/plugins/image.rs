use async_trait::async_trait;
use std::path::Path;

use super::actions::{ActionContext, ActionOutcome, ActionReport, ActionSettings};
use super::{ExecutionResult, Plugin};
use crate::payload::{Action, ImageAction, ImagePayload, Payload, PayloadSchema, RawPayload};
use crate::tools::Toolbox;
use crate::utils;
use crate::Result;

/// OCR and document conversion for image files
pub struct ImagePlugin {
    tools: Toolbox,
    settings: ActionSettings,
}

impl ImagePlugin {
    pub fn new(tools: Toolbox, settings: ActionSettings) -> Self {
        Self { tools, settings }
    }

    async fn perform(
        &self,
        action: ImageAction,
        payload: &ImagePayload,
        ctx: &ActionContext,
    ) -> Result<ActionOutcome> {
        let input = Path::new(&payload.input_path);
        let renderer = &self.tools.renderer;

        // skipped before touching the input
        if action == ImageAction::Convert && payload.target_format.is_none() {
            return Ok(ActionOutcome::Skipped("no target_format given".to_string()));
        }
        utils::check_file_accessible(input)?;

        match action {
            ImageAction::Ocr => {
                let text = self.tools.ocr.recognize(input).await?;
                Ok(ActionOutcome::Text(text))
            }
            ImageAction::ToPdf => {
                let output = ctx.output_path_for(input, "pdf");
                renderer.image_to_pdf(input, &output).await?;
                Ok(ActionOutcome::File(output))
            }
            ImageAction::ToDocx => {
                let output = ctx.output_path_for(input, "docx");
                renderer.image_to_docx(input, &output).await?;
                Ok(ActionOutcome::File(output))
            }
            ImageAction::Convert => {
                let format = payload.target_format.as_deref().unwrap_or_default();
                let output = ctx.output_path_for(input, &format.to_ascii_lowercase());
                crate::tools::ensure_distinct(input, &output)?;
                renderer.convert_image(input, &output).await?;
                Ok(ActionOutcome::File(output))
            }
        }
    }
}

#[async_trait]
impl Plugin for ImagePlugin {
    fn name(&self) -> &'static str {
        ImagePayload::SCHEMA.domain
    }

    fn description(&self) -> &'static str {
        "Read text from an image or turn it into a PDF, DOCX or another image format"
    }

    fn schema(&self) -> &'static PayloadSchema {
        &ImagePayload::SCHEMA
    }

    async fn run(&self, raw: RawPayload) -> Result<ExecutionResult> {
        let payload = ImagePayload::from_raw(raw)?;
        let ctx = ActionContext::new(&self.settings)?;

        let mut report = ActionReport::new();
        for action in payload.requested_actions() {
            let outcome = ctx.run(action.token(), self.perform(action, &payload, &ctx)).await;
            report.record(action.token(), action.output_key(), outcome);
        }

        Ok(report.into_result())
    }
}
