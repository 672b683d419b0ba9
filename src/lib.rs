//! Universal Converter - A Rust CLI tool for converting media through domain plugins
//!
//! This library dispatches user-selected actions (download, transcode, transcribe,
//! summarize, OCR, render-to-document) across YouTube URLs, local video, local audio,
//! images and text files. Every domain plugin accepts a validated payload and returns
//! the same [`ExecutionResult`] envelope, and the [`Dispatcher`] guarantees that no
//! plugin failure ever escapes as an error.

pub mod cli;
pub mod config;
pub mod output;
pub mod payload;
pub mod plugins;
pub mod tools;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use payload::{Payload, PayloadSchema, RawPayload, SummaryLength};
pub use plugins::dispatch::Dispatcher;
pub use plugins::registry::PluginRegistry;
pub use plugins::{ExecutionResult, Plugin};
pub use tools::Toolbox;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the converter
#[derive(thiserror::Error, Debug)]
pub enum ConverterError {
    #[error("No plugin '{0}'")]
    UnknownPlugin(String),

    #[error("Plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("Plugin key must not be empty")]
    EmptyPluginKey,

    #[error("Invalid {domain} payload: {reason}")]
    InvalidPayload { domain: &'static str, reason: String },

    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    #[error("Action '{action}' timed out after {seconds}s")]
    ActionTimedOut { action: &'static str, seconds: u64 },

    #[error("File operation failed: {0}")]
    FileError(String),

    #[error("Plugin panicked: {0}")]
    PluginPanicked(String),

    #[error("OpenAI API key is not configured (set OPENAI_API_KEY or openai.api_key)")]
    MissingApiKey,
}
