use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External command-line tools
    pub tools: ToolsConfig,

    /// OpenAI API settings
    pub openai: OpenAiConfig,

    /// Document and image rendering settings
    pub render: RenderConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// yt-dlp executable
    pub yt_dlp: String,

    /// ffmpeg executable
    pub ffmpeg: String,

    /// whisper executable (openai-whisper CLI)
    pub whisper: String,

    /// Whisper model name
    pub whisper_model: String,

    /// tesseract executable
    pub tesseract: String,

    /// Tesseract language code(s), e.g. "eng" or "eng+kor"
    pub tesseract_lang: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (falls back to the OPENAI_API_KEY environment variable)
    pub api_key: Option<String>,

    /// API base URL
    pub base_url: String,

    /// Chat model used for summaries
    pub summary_model: String,

    /// Speech model used for text-to-speech
    pub tts_model: String,

    /// Voice used for text-to-speech
    pub tts_voice: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// TrueType font used to render text into images
    pub font_path: PathBuf,

    /// Font size in pixels for rendered text
    pub font_size: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where outputs are written (current directory if unset)
    pub output_dir: Option<PathBuf>,

    /// Append a per-request id to output file names
    pub unique_outputs: bool,

    /// Upper bound for a single action, in seconds
    pub action_timeout_secs: Option<u64>,

    /// Default output format
    pub default_output_format: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            whisper: "whisper".to_string(),
            whisper_model: "base".to_string(),
            tesseract: "tesseract".to_string(),
            tesseract_lang: "eng".to_string(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            summary_model: "gpt-4-turbo".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            font_size: 16.0,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            unique_outputs: true,
            action_timeout_secs: None,
            default_output_format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path).await
        } else {
            let mut config = Self::default();
            config.save().await?;
            config.apply_env();
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let mut config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("universal-converter").join("config.yaml"))
    }

    fn apply_env(&mut self) {
        if self.openai.api_key.as_deref().map_or(true, str::is_empty) {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                if !key.is_empty() {
                    self.openai.api_key = Some(key);
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        crate::utils::validate_and_normalize_url(&self.openai.base_url)
            .context("openai.base_url is invalid")?;

        if !(self.render.font_size > 0.0) {
            anyhow::bail!("render.font_size must be positive");
        }

        if self.app.action_timeout_secs == Some(0) {
            anyhow::bail!("app.action_timeout_secs must be greater than zero");
        }

        for (name, value) in [
            ("tools.yt_dlp", &self.tools.yt_dlp),
            ("tools.ffmpeg", &self.tools.ffmpeg),
            ("tools.whisper", &self.tools.whisper),
            ("tools.tesseract", &self.tools.tesseract),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} must not be empty", name);
            }
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.tools.yt_dlp);
        println!("  ffmpeg: {}", self.tools.ffmpeg);
        println!("  whisper: {} (model: {})", self.tools.whisper, self.tools.whisper_model);
        println!("  tesseract: {} (lang: {})", self.tools.tesseract, self.tools.tesseract_lang);
        println!("  OpenAI base URL: {}", self.openai.base_url);
        println!(
            "  OpenAI API key: {}",
            if self.openai.api_key.is_some() { "configured" } else { "not set" }
        );
        println!("  Summary model: {}", self.openai.summary_model);
        println!("  TTS model: {} (voice: {})", self.openai.tts_model, self.openai.tts_voice);
        println!("  Font: {}", self.render.font_path.display());
        match &self.app.output_dir {
            Some(dir) => println!("  Output directory: {}", dir.display()),
            None => println!("  Output directory: current directory"),
        }
        println!("  Unique outputs: {}", self.app.unique_outputs);
        match self.app.action_timeout_secs {
            Some(secs) => println!("  Action timeout: {}s", secs),
            None => println!("  Action timeout: none"),
        }
    }

    /// Point the user at the file to edit
    pub fn interactive_setup(&self) -> Result<()> {
        print!("{}", Self::setup_hint(&Self::config_path()?));
        Ok(())
    }

    fn setup_hint(path: &Path) -> String {
        format!(
            "Edit tool paths, OpenAI settings and output options in:\n  {}\nRun `converter config --show` to see the values in effect.\n",
            path.display()
        )
    }

    /// Per-action timeout
    pub fn action_timeout(&self) -> Option<Duration> {
        self.app.action_timeout_secs.map(Duration::from_secs)
    }
}
