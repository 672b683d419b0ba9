use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::path::Path;

use super::{SpeechSynthesizer, Summarizer};
use crate::config::OpenAiConfig;
use crate::payload::SummaryLength;
use crate::{ConverterError, Result};

/// Returned instead of a summary when there is nothing to summarize
pub const EMPTY_TRANSCRIPT: &str = "No transcript available.";

/// Audio formats accepted by the speech endpoint
pub const SPEECH_FORMATS: &[&str] = &["mp3", "opus", "aac", "flac", "wav", "pcm"];

/// Chat-completion summaries and speech synthesis over the OpenAI HTTP API
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ConverterError::MissingApiKey)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).context("Invalid API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response> {
        let headers = self.build_headers()?;
        let url = self.endpoint(path);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error {}: {}", status.as_u16(), text);
        }

        Ok(response)
    }
}

/// Prompt sent to the chat model
pub fn build_prompt(text: &str, length: SummaryLength) -> String {
    let style = match length {
        SummaryLength::Short => "briefly, in a few sentences",
        SummaryLength::Detailed => "in detail, covering every main point",
    };
    format!("Summarize the following text {}:\n\n{}", style, text)
}

fn parse_summary(body: &Value) -> Result<String> {
    let content = body
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("OpenAI response did not contain a message"))?;

    Ok(content.trim().to_string())
}

#[async_trait]
impl Summarizer for OpenAiClient {
    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(EMPTY_TRANSCRIPT.to_string());
        }

        tracing::info!("Requesting {} summary from {}", length, self.config.summary_model);

        let body = json!({
            "model": self.config.summary_model,
            "messages": [{ "role": "user", "content": build_prompt(text, length) }],
        });
        let response: Value = self
            .post("chat/completions", &body)
            .await?
            .json()
            .await
            .context("Failed to decode OpenAI response")?;

        parse_summary(&response)
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiClient {
    async fn synthesize(&self, text: &str, format: &str, output: &Path) -> Result<()> {
        if !SPEECH_FORMATS.contains(&format) {
            anyhow::bail!(
                "Unsupported speech format '{}' (supported: {})",
                format,
                SPEECH_FORMATS.join(", ")
            );
        }
        if text.trim().is_empty() {
            anyhow::bail!("Nothing to read aloud: the text is empty");
        }

        tracing::info!("Synthesizing speech with {} ({})", self.config.tts_model, self.config.tts_voice);

        let body = json!({
            "model": self.config.tts_model,
            "voice": self.config.tts_voice,
            "input": text,
            "response_format": format,
        });
        let audio = self
            .post("audio/speech", &body)
            .await?
            .bytes()
            .await
            .context("Failed to read synthesized audio")?;

        fs_err::write(output, &audio)?;
        tracing::debug!(
            "Wrote {} of audio to {}",
            crate::utils::format_file_size(audio.len() as u64),
            output.display()
        );

        Ok(())
    }
}
