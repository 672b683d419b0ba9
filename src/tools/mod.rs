//! External collaborators the domain plugins delegate their media work to.
//!
//! Each concern sits behind an async trait so plugins can be exercised without the
//! real binaries or network services. [`Toolbox::from_config`] wires up the concrete
//! implementations.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use tokio::process::Command;

pub mod ffmpeg;
pub mod openai;
pub mod render;
pub mod tesseract;
pub mod whisper;
pub mod ytdlp;

use crate::config::Config;
use crate::payload::SummaryLength;
use crate::{ConverterError, Result};

/// Downloads media and subtitles from a video platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download a video no taller than `max_height`, merged to mp4.
    /// `output_dir` receives the file; `tag` is appended to its name.
    async fn download_video(
        &self,
        url: &str,
        max_height: u32,
        output_dir: &Path,
        tag: Option<String>,
    ) -> Result<PathBuf>;

    /// Download the audio track converted to `format`
    async fn download_audio(
        &self,
        url: &str,
        format: &str,
        output_dir: &Path,
        tag: Option<String>,
    ) -> Result<PathBuf>;

    /// Plain-text transcript from the video's subtitles, if it has any
    async fn fetch_subtitles(&self, url: &str, work_dir: &Path) -> Result<Option<String>>;
}

/// Converts between audio/video containers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Write the audio stream of `input` to `output`, format chosen by extension
    async fn transcode_audio(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Turns recorded speech into text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, media: &Path) -> Result<String>;
}

/// Produces summaries of long text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String>;
}

/// Reads text aloud into an audio file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, format: &str, output: &Path) -> Result<()>;
}

/// Extracts text from images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &Path) -> Result<String>;
}

/// Renders documents and images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Single-page PDF showing the image
    async fn image_to_pdf(&self, image: &Path, output: &Path) -> Result<()>;

    /// Word document containing the image
    async fn image_to_docx(&self, image: &Path, output: &Path) -> Result<()>;

    /// Re-encode an image, format chosen by the output extension
    async fn convert_image(&self, image: &Path, output: &Path) -> Result<()>;

    /// Paginated PDF of the text lines
    async fn text_to_pdf(&self, text: &str, output: &Path) -> Result<()>;

    /// PNG image of the text lines
    async fn text_to_image(&self, text: &str, output: &Path) -> Result<()>;
}

/// All collaborators a plugin may call
#[derive(Clone)]
pub struct Toolbox {
    pub downloader: Arc<dyn MediaDownloader>,
    pub transcoder: Arc<dyn Transcoder>,
    pub speech_to_text: Arc<dyn SpeechToText>,
    pub summarizer: Arc<dyn Summarizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub ocr: Arc<dyn OcrEngine>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl Toolbox {
    /// Build the production toolbox from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let openai = Arc::new(openai::OpenAiClient::new(config.openai.clone())?);

        Ok(Self {
            downloader: Arc::new(ytdlp::YtDlp::new(&config.tools.yt_dlp)),
            transcoder: Arc::new(ffmpeg::Ffmpeg::new(&config.tools.ffmpeg)),
            speech_to_text: Arc::new(whisper::WhisperCli::new(
                &config.tools.whisper,
                &config.tools.whisper_model,
            )),
            summarizer: openai.clone(),
            synthesizer: openai,
            ocr: Arc::new(tesseract::Tesseract::new(
                &config.tools.tesseract,
                &config.tools.tesseract_lang,
            )),
            renderer: Arc::new(render::NativeRenderer::new(config.render.clone())),
        })
    }
}

/// Run an external tool to completion, failing on a non-zero exit status
pub(crate) async fn run_tool(tool: &str, mut command: Command) -> Result<Output> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    tracing::debug!("Running {}: {:?}", tool, command.as_std());

    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ConverterError::ToolFailed {
            tool: tool.to_string(),
            reason: format!("could not start '{}': {}", program, e),
        })?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(ConverterError::ToolFailed {
            tool: tool.to_string(),
            reason: format!("{} ({})", error.trim(), output.status),
        }
        .into());
    }

    Ok(output)
}

/// Refuse to write an output over its own input
pub(crate) fn ensure_distinct(input: &Path, output: &Path) -> Result<()> {
    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        return Err(ConverterError::FileError(format!(
            "output {} would overwrite its input",
            output.display()
        ))
        .into());
    }
    Ok(())
}
