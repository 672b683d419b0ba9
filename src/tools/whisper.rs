use async_trait::async_trait;
use std::path::Path;
use tempfile::TempDir;
use tokio::process::Command;

use super::{run_tool, SpeechToText};
use crate::utils::check_file_accessible;
use crate::Result;

/// Speech-to-text through the openai-whisper command-line tool
pub struct WhisperCli {
    whisper_path: String,
    model: String,
}

impl WhisperCli {
    pub fn new(whisper_path: &str, model: &str) -> Self {
        Self {
            whisper_path: whisper_path.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperCli {
    async fn transcribe(&self, media: &Path) -> Result<String> {
        check_file_accessible(media)?;

        // whisper names its output after the input stem inside --output_dir
        let out_dir = TempDir::new()?;
        tracing::info!("Transcribing {} with whisper model '{}'", media.display(), self.model);

        let mut command = Command::new(&self.whisper_path);
        command
            .arg(media)
            .args(["--model", self.model.as_str()])
            .args(["--output_format", "txt"])
            .arg("--output_dir")
            .arg(out_dir.path())
            .args(["--verbose", "False"]);
        run_tool("whisper", command).await?;

        let stem = media
            .file_stem()
            .ok_or_else(|| anyhow::anyhow!("Invalid media path: {}", media.display()))?;
        let transcript_path = out_dir.path().join(format!("{}.txt", stem.to_string_lossy()));
        let transcript = fs_err::read_to_string(&transcript_path)?;

        Ok(transcript.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}
