use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Config pointing every tool at a binary that does not exist
fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    let yaml = format!(
        "tools:\n  ffmpeg: /nonexistent/ffmpeg\n  yt_dlp: /nonexistent/yt-dlp\n  whisper: /nonexistent/whisper\n  tesseract: /nonexistent/tesseract\napp:\n  output_dir: {}\n",
        dir.join("out").display()
    );
    std::fs::write(&path, yaml).unwrap();
    path
}

fn converter(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("converter").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG")
        .arg("--quiet")
        .arg("--config")
        .arg(config);
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("converter")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("youtube"))
        .stdout(predicate::str::contains("plugins"));
}

#[test]
fn test_plugins_lists_every_domain() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    converter(&config)
        .arg("plugins")
        .assert()
        .success()
        .stdout(predicate::str::contains("youtube"))
        .stdout(predicate::str::contains("video"))
        .stdout(predicate::str::contains("audio"))
        .stdout(predicate::str::contains("image"))
        .stdout(predicate::str::contains("text"));
}

#[test]
fn test_actions_are_required() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    converter(&config)
        .args(["audio", "in.wav"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--actions"));
}

#[test]
fn test_unrecognized_action_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let input = dir.path().join("in.wav");
    std::fs::write(&input, b"RIFF").unwrap();

    converter(&config)
        .args(["--format", "json", "audio"])
        .arg(&input)
        .args(["--actions", "bogus"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": true"));
}

#[test]
fn test_tool_failure_sets_exit_code() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let input = dir.path().join("in.wav");
    std::fs::write(&input, b"RIFF").unwrap();

    converter(&config)
        .args(["--format", "json", "audio"])
        .arg(&input)
        .args(["--actions", "convert"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"success\": false"))
        .stdout(predicate::str::contains("ffmpeg failed"));
}

#[test]
fn test_text_to_pdf_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "first line\nsecond line").unwrap();

    converter(&config)
        .arg("text")
        .arg(&input)
        .args(["--actions", "to-pdf"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("pdf: "))
        .stdout(predicate::str::contains(".pdf"));

    let produced = std::fs::read_dir(dir.path().join("out")).unwrap().count();
    assert_eq!(produced, 1);
}

#[test]
fn test_invalid_payload_reports_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    converter(&config)
        .args(["youtube", "not-a-url", "--actions", "video"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid youtube payload"));
}
