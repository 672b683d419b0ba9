use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use super::{ensure_distinct, run_tool, Transcoder};
use crate::utils::check_file_accessible;
use crate::Result;

/// Audio extraction and conversion through ffmpeg
pub struct Ffmpeg {
    ffmpeg_path: String,
}

impl Ffmpeg {
    pub fn new(ffmpeg_path: &str) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.to_string(),
        }
    }

    fn transcode_args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-vn".to_string(), // No video
            "-y".to_string(),  // Overwrite output file
            output.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn transcode_audio(&self, input: &Path, output: &Path) -> Result<()> {
        check_file_accessible(input)?;
        ensure_distinct(input, output)?;

        tracing::debug!("Transcoding {} -> {}", input.display(), output.display());

        let mut command = Command::new(&self.ffmpeg_path);
        command.args(Self::transcode_args(input, output));
        run_tool("ffmpeg", command).await?;

        if !output.exists() {
            anyhow::bail!("ffmpeg reported success but {} was not created", output.display());
        }

        Ok(())
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_args_drop_video() {
        let args = Ffmpeg::transcode_args(Path::new("in.mp4"), Path::new("out.mp3"));
        assert_eq!(args[args.len() - 1], "out.mp3");
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "in.mp4"));
    }

    #[tokio::test]
    async fn test_missing_input_is_rejected_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = Ffmpeg::default();
        let err = ffmpeg
            .transcode_audio(&dir.path().join("missing.wav"), &dir.path().join("out.mp3"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"), "{err}");
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.mp3");
        std::fs::write(&input, b"ID3").unwrap();

        let err = Ffmpeg::default().transcode_audio(&input, &input).await.unwrap_err();
        assert!(err.to_string().contains("overwrite"), "{err}");
    }
}
