use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use super::{run_tool, OcrEngine};
use crate::utils::check_file_accessible;
use crate::Result;

/// OCR through the tesseract command-line tool
pub struct Tesseract {
    tesseract_path: String,
    language: String,
}

impl Tesseract {
    pub fn new(tesseract_path: &str, language: &str) -> Self {
        Self {
            tesseract_path: tesseract_path.to_string(),
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl OcrEngine for Tesseract {
    async fn recognize(&self, image: &Path) -> Result<String> {
        check_file_accessible(image)?;

        let mut command = Command::new(&self.tesseract_path);
        command
            .arg(image)
            .arg("stdout")
            .args(["-l", self.language.as_str()]);

        let output = run_tool("tesseract", command).await?;
        let text = String::from_utf8_lossy(&output.stdout);

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_tesseract(dir: &Path) -> std::path::PathBuf {
        // Stand-in for tesseract: insists on "<image> stdout -l <lang>" and prints padded text
        let script = dir.join("fake-tesseract");
        std::fs::write(
            &script,
            "#!/bin/sh\nif [ \"$2\" != \"stdout\" ] || [ \"$3\" != \"-l\" ] || [ \"$4\" != \"deu\" ]; then\n  echo \"unexpected args: $*\" >&2\n  exit 3\nfi\n[ -f \"$1\" ] || exit 4\nprintf '\\n  Rechnung 42\\n\\n'\n",
        )
        .unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        script
    }

    #[tokio::test]
    async fn test_missing_image_fails() {
        let ocr = Tesseract::new("tesseract", "eng");
        let err = ocr.recognize(Path::new("/nonexistent/scan.png")).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_reads_trimmed_stdout_for_language() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_tesseract(dir.path());
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"\x89PNG").unwrap();

        let ocr = Tesseract::new(&script.to_string_lossy(), "deu");
        let text = ocr.recognize(&image).await.unwrap();
        assert_eq!(text, "Rechnung 42");
    }

    #[tokio::test]
    async fn test_tool_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_tesseract(dir.path());
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"\x89PNG").unwrap();

        let ocr = Tesseract::new(&script.to_string_lossy(), "eng");
        let err = ocr.recognize(&image).await.unwrap_err();
        assert!(err.to_string().contains("unexpected args"), "{err}");
    }
}
