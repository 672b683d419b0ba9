use anyhow::Result;
use std::path::Path;
use url::Url;

use crate::config::ToolsConfig;

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed.to_string())
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized = filename
        .chars()
        .map(|c| {
            match c {
                // Keep alphanumeric characters, hyphens, underscores, and dots
                c if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' => c,
                _ => '_',
            }
        })
        .collect::<String>();

    let trimmed = sanitized.trim_matches(|c| c == '_' || c == '.');
    if trimmed.is_empty() {
        "output".to_string()
    } else {
        trimmed.to_string()
    }
}

/// File stem of an input path, sanitized for use in output names
pub fn file_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    sanitize_filename(&stem)
}

/// Build an output file name, optionally tagged with a request id
pub fn output_file_name(stem: &str, request_id: Option<&str>, extension: &str) -> String {
    match request_id {
        Some(id) => format!("{}_{}.{}", sanitize_filename(stem), id, extension),
        None => format!("{}.{}", sanitize_filename(stem), extension),
    }
}

/// Short random identifier for one dispatch call
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Check that a file exists, is a regular file and is not empty
pub fn check_file_accessible(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("Path is not a file: {}", path.display());
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| anyhow::anyhow!("Cannot access file {}: {}", path.display(), e))?;

    if metadata.len() == 0 {
        anyhow::bail!("File is empty: {}", path.display());
    }

    Ok(())
}

/// Check if the current environment has the external tools the plugins call
pub async fn check_dependencies(tools: &ToolsConfig) -> Vec<String> {
    let checks = [
        (tools.yt_dlp.as_str(), "--version", "required for YouTube downloads and subtitles"),
        (tools.ffmpeg.as_str(), "-version", "required for audio extraction and conversion"),
        (tools.whisper.as_str(), "--help", "required for speech-to-text summaries"),
        (tools.tesseract.as_str(), "--version", "required for image OCR"),
    ];

    let mut missing = Vec::new();
    for (program, probe, purpose) in checks {
        if !check_command_available(program, probe).await {
            missing.push(format!("{} - {}", program, purpose));
        }
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, probe: &str) -> bool {
    use std::process::Stdio;
    use tokio::process::Command;

    Command::new(command)
        .arg(probe)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Hello World!"), "Hello_World");
        assert_eq!(sanitize_filename("test/file?name"), "test_file_name");
        assert_eq!(sanitize_filename("../.."), "output");
        assert_eq!(sanitize_filename("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("in", None, "mp3"), "in.mp3");
        assert_eq!(output_file_name("in", Some("1a2b3c4d"), "mp3"), "in_1a2b3c4d.mp3");
        assert_eq!(file_stem(&PathBuf::from("/tmp/my clip.mov")), "my_clip");
        assert_eq!(file_stem(&PathBuf::from("")), "output");
    }

    #[test]
    fn test_new_request_id() {
        let first = new_request_id();
        let second = new_request_id();
        assert_eq!(first.len(), 8);
        assert_ne!(first, second);
    }

    #[test]
    fn test_check_file_accessible() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.wav");
        std::fs::write(&empty, b"").unwrap();
        let full = dir.path().join("full.wav");
        std::fs::write(&full, b"RIFF").unwrap();

        assert!(check_file_accessible(&dir.path().join("missing.wav")).is_err());
        assert!(check_file_accessible(dir.path()).is_err());
        assert!(check_file_accessible(&empty).is_err());
        assert!(check_file_accessible(&full).is_ok());
    }

    #[test]
    fn test_validate_and_normalize_url() {
        assert!(validate_and_normalize_url("https://example.com").is_ok());
        assert!(validate_and_normalize_url("http://example.com").is_ok());
        assert!(validate_and_normalize_url("ftp://example.com").is_err());
        assert!(validate_and_normalize_url("not-a-url").is_err());
    }

    #[tokio::test]
    async fn test_missing_tools_are_reported() {
        let tools = ToolsConfig {
            yt_dlp: "/nonexistent/yt-dlp".to_string(),
            ffmpeg: "/nonexistent/ffmpeg".to_string(),
            whisper: "/nonexistent/whisper".to_string(),
            tesseract: "/nonexistent/tesseract".to_string(),
            ..ToolsConfig::default()
        };
        let missing = check_dependencies(&tools).await;
        assert_eq!(missing.len(), 4);
        assert!(missing[0].starts_with("/nonexistent/yt-dlp"));
    }
}
