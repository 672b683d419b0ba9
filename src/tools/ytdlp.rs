use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::{run_tool, MediaDownloader};
use crate::Result;

/// YouTube downloader using yt-dlp
pub struct YtDlp {
    yt_dlp_path: String,
}

impl YtDlp {
    pub fn new(yt_dlp_path: &str) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.to_string(),
        }
    }

    /// Output template `<dir>/%(id)s[_tag].%(ext)s`
    fn output_template(output_dir: &Path, tag: Option<&str>) -> String {
        let name = match tag {
            Some(tag) => format!("%(id)s_{}.%(ext)s", tag),
            None => "%(id)s.%(ext)s".to_string(),
        };
        output_dir.join(name).to_string_lossy().into_owned()
    }

    /// Run yt-dlp and return the final file path it reports
    async fn download(&self, url: &str, args: &[&str], template: &str) -> Result<PathBuf> {
        tracing::debug!("Downloading with yt-dlp: {}", url);

        let mut command = Command::new(&self.yt_dlp_path);
        command
            .args(args)
            .args([
                "--output", template,
                "--no-playlist",
                "--no-progress",
                // Print the path after post-processing, but still download
                "--print", "after_move:filepath",
                "--no-simulate",
                url,
            ]);

        let output = run_tool("yt-dlp", command).await?;
        let stdout = String::from_utf8(output.stdout)?;
        let path = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .ok_or_else(|| anyhow::anyhow!("yt-dlp did not report a downloaded file for {}", url))?;

        Ok(PathBuf::from(path))
    }
}

/// yt-dlp format selector for a maximum video height
pub fn video_format_selector(max_height: u32) -> String {
    format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]/best", h = max_height)
}

/// Strip a WebVTT subtitle file down to its spoken lines
pub fn vtt_to_text(vtt: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_header = true;

    for raw in vtt.lines() {
        let line = raw.trim();

        if line.is_empty() {
            in_header = false;
            continue;
        }
        // Header block: WEBVTT line plus "Kind:"/"Language:" metadata
        if in_header || line.starts_with("WEBVTT") || line.starts_with("NOTE") {
            continue;
        }
        if line.contains("-->") || line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let text = strip_tags(line);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        // Auto-generated captions repeat each line across cues
        if lines.last().map(String::as_str) == Some(text) {
            continue;
        }
        lines.push(text.to_string());
    }

    lines.join(" ")
}

fn strip_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&").replace("&nbsp;", " ")
}

#[async_trait]
impl MediaDownloader for YtDlp {
    async fn download_video(
        &self,
        url: &str,
        max_height: u32,
        output_dir: &Path,
        tag: Option<String>,
    ) -> Result<PathBuf> {
        let format = video_format_selector(max_height);
        let template = Self::output_template(output_dir, tag.as_deref());

        self.download(
            url,
            &["--format", format.as_str(), "--merge-output-format", "mp4"],
            &template,
        )
        .await
    }

    async fn download_audio(
        &self,
        url: &str,
        format: &str,
        output_dir: &Path,
        tag: Option<String>,
    ) -> Result<PathBuf> {
        let template = Self::output_template(output_dir, tag.as_deref());

        self.download(
            url,
            &[
                "--format", "bestaudio/best",
                "--extract-audio",
                "--audio-format", format,
                "--audio-quality", "192K",
            ],
            &template,
        )
        .await
    }

    async fn fetch_subtitles(&self, url: &str, work_dir: &Path) -> Result<Option<String>> {
        tracing::debug!("Fetching subtitles for: {}", url);

        let template = work_dir.join("%(id)s").to_string_lossy().into_owned();
        let mut command = Command::new(&self.yt_dlp_path);
        command.args([
            "--write-subs",
            "--write-auto-subs",
            "--sub-format", "vtt",
            "--skip-download",
            "--no-playlist",
            "--output", template.as_str(),
            url,
        ]);
        run_tool("yt-dlp", command).await?;

        let mut vtt_files: Vec<PathBuf> = fs_err::read_dir(work_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("vtt"))
            .collect();
        vtt_files.sort();

        if vtt_files.is_empty() {
            tracing::info!("No subtitles available for {}", url);
            return Ok(None);
        }

        let mut transcript = Vec::with_capacity(vtt_files.len());
        for file in &vtt_files {
            let content = fs_err::read_to_string(file)?;
            let text = vtt_to_text(&content);
            if !text.is_empty() {
                transcript.push(text);
            }
        }

        if transcript.is_empty() {
            return Ok(None);
        }
        Ok(Some(transcript.join(" ")))
    }
}
