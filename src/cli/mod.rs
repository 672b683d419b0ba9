use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::payload::{RawPayload, SummaryLength};

#[derive(Parser)]
#[command(
    name = "converter",
    about = "Universal Converter - Download, convert, transcribe and summarize media through domain plugins",
    version,
    long_about = "A CLI tool that routes conversion requests to domain plugins: YouTube URLs, local video, local audio, images and text files. Each run prints one result envelope with the produced files and text."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators and dependency warnings
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Result format (defaults to app.default_output_format from the config)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Configuration file to use instead of the default location
    #[arg(short, long, value_name = "FILE", env = "CONVERTER_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a YouTube video or its audio, or summarize it
    Youtube {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Actions to run: video, audio, summary
        #[arg(short, long, value_delimiter = ',', required = true)]
        actions: Vec<String>,

        /// Maximum video height, e.g. 720p
        #[arg(long, default_value = "720p")]
        video_quality: String,

        /// Audio format for the audio action
        #[arg(long, default_value = "mp3")]
        audio_format: String,

        /// Summary verbosity
        #[arg(long, value_enum, default_value = "short")]
        summary_length: LengthArg,
    },

    /// Extract audio from a local video or summarize it
    Video {
        /// Video file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Actions to run: audio, summary
        #[arg(short, long, value_delimiter = ',', required = true)]
        actions: Vec<String>,

        /// Audio format for the audio action
        #[arg(long, default_value = "mp3")]
        audio_format: String,

        /// Summary verbosity
        #[arg(long, value_enum, default_value = "short")]
        summary_length: LengthArg,
    },

    /// Convert a local audio file or summarize it
    Audio {
        /// Audio file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Actions to run: convert, summary
        #[arg(short, long, value_delimiter = ',', required = true)]
        actions: Vec<String>,

        /// Format for the convert action
        #[arg(long, default_value = "mp3")]
        target_format: String,

        /// Summary verbosity
        #[arg(long, value_enum, default_value = "short")]
        summary_length: LengthArg,
    },

    /// OCR an image or convert it to PDF, DOCX or another format
    Image {
        /// Image file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Actions to run: ocr, to-pdf, to-docx, convert
        #[arg(short, long, value_delimiter = ',', required = true)]
        actions: Vec<String>,

        /// Format for the convert action (convert is skipped without it)
        #[arg(long)]
        target_format: Option<String>,
    },

    /// Summarize a text file, read it aloud or render it
    Text {
        /// Text file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Actions to run: summarize, tts, to-pdf, to-image
        #[arg(short, long, value_delimiter = ',', required = true)]
        actions: Vec<String>,

        /// Summary verbosity
        #[arg(long, value_enum, default_value = "short")]
        summary_length: LengthArg,

        /// Audio format for the tts action
        #[arg(long, default_value = "mp3")]
        tts_format: String,
    },

    /// Show or edit configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List registered plugins
    Plugins,
}

impl Commands {
    /// Domain key and payload for plugin commands; `None` for the rest
    pub fn to_request(&self) -> Option<(&'static str, RawPayload)> {
        let (domain, value) = match self {
            Commands::Youtube {
                url,
                actions,
                video_quality,
                audio_format,
                summary_length,
            } => (
                "youtube",
                json!({
                    "url": url,
                    "actions": actions,
                    "video_quality": video_quality,
                    "audio_format": audio_format,
                    "summary_length": SummaryLength::from(*summary_length),
                }),
            ),
            Commands::Video {
                input,
                actions,
                audio_format,
                summary_length,
            } => (
                "video",
                json!({
                    "input_path": input.to_string_lossy(),
                    "actions": actions,
                    "audio_format": audio_format,
                    "summary_length": SummaryLength::from(*summary_length),
                }),
            ),
            Commands::Audio {
                input,
                actions,
                target_format,
                summary_length,
            } => (
                "audio",
                json!({
                    "input_path": input.to_string_lossy(),
                    "actions": actions,
                    "target_format": target_format,
                    "summary_length": SummaryLength::from(*summary_length),
                }),
            ),
            Commands::Image {
                input,
                actions,
                target_format,
            } => {
                let mut value = json!({ "input_path": input.to_string_lossy(), "actions": actions });
                if let Some(format) = target_format {
                    value["target_format"] = Value::from(format.as_str());
                }
                ("image", value)
            }
            Commands::Text {
                input,
                actions,
                summary_length,
                tts_format,
            } => (
                "text",
                json!({
                    "input_path": input.to_string_lossy(),
                    "actions": actions,
                    "summary_length": SummaryLength::from(*summary_length),
                    "tts_format": tts_format,
                }),
            ),
            Commands::Config { .. } | Commands::Plugins => return None,
        };

        match value {
            Value::Object(map) => Some((domain, map)),
            _ => None,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// One `name: value` line per output
    Text,
    /// The result envelope as JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LengthArg {
    Short,
    Detailed,
}

impl From<LengthArg> for SummaryLength {
    fn from(arg: LengthArg) -> Self {
        match arg {
            LengthArg::Short => SummaryLength::Short,
            LengthArg::Detailed => SummaryLength::Detailed,
        }
    }
}
