//! Typed payloads for every plugin domain.
//!
//! Callers hand the dispatcher an untyped [`RawPayload`]; each plugin turns it into
//! one of the structs below with [`Payload::from_raw`] before doing any work.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::utils;
use crate::ConverterError;

/// Untyped field-name to value mapping built by a caller
pub type RawPayload = serde_json::Map<String, Value>;

/// Static description of a payload's fields and action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayloadSchema {
    /// Domain key the payload belongs to
    pub domain: &'static str,

    /// Fields that must be present
    pub required: &'static [&'static str],

    /// Optional fields with their default value (`None` means no default)
    pub optional: &'static [(&'static str, Option<&'static str>)],

    /// Recognized action tokens
    pub actions: &'static [&'static str],
}

/// A named unit of work within a domain
pub trait Action: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Every action of the domain, in declaration order
    const ALL: &'static [Self];

    /// Token used in the `actions` list
    fn token(self) -> &'static str;

    /// Key the action's result is stored under in the envelope
    fn output_key(self) -> &'static str;

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|action| action.token() == token)
    }
}

/// Validated input of a domain plugin
pub trait Payload: DeserializeOwned + Sized {
    type Action: Action;

    const SCHEMA: PayloadSchema;

    /// Raw action tokens as supplied by the caller
    fn action_tokens(&self) -> &[String];

    /// Domain-specific checks run after deserialization
    fn validate(&self) -> Result<(), ConverterError> {
        Ok(())
    }

    /// Deserialize and validate a raw mapping
    fn from_raw(raw: RawPayload) -> Result<Self, ConverterError> {
        let payload: Self =
            serde_json::from_value(Value::Object(raw)).map_err(|e| invalid::<Self>(e.to_string()))?;
        payload.validate()?;
        Ok(payload)
    }

    /// Recognized actions in first-seen order, duplicates removed.
    /// Unrecognized tokens are ignored.
    fn requested_actions(&self) -> Vec<Self::Action> {
        let mut actions = Vec::with_capacity(Self::Action::ALL.len());
        for token in self.action_tokens() {
            match Self::Action::from_token(token) {
                Some(action) if !actions.contains(&action) => actions.push(action),
                Some(_) => {}
                None => {
                    tracing::debug!(domain = Self::SCHEMA.domain, token = %token, "Ignoring unrecognized action");
                }
            }
        }
        actions
    }
}

fn invalid<P: Payload>(reason: impl Into<String>) -> ConverterError {
    ConverterError::InvalidPayload {
        domain: P::SCHEMA.domain,
        reason: reason.into(),
    }
}

/// Summary verbosity requested from the language model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    #[default]
    Short,
    Detailed,
}

impl SummaryLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryLength::Short => "short",
            SummaryLength::Detailed => "detailed",
        }
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_video_quality() -> String {
    "720p".to_string()
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn check_input_path<P: Payload>(path: &str) -> Result<(), ConverterError> {
    if path.trim().is_empty() {
        return Err(invalid::<P>("input_path must not be empty"));
    }
    Ok(())
}

fn check_format<P: Payload>(field: &str, value: &str) -> Result<(), ConverterError> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid::<P>(format!("{} must be a file extension like 'mp3', got '{}'", field, value)));
    }
    Ok(())
}

macro_rules! domain_actions {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($token:literal, $key:literal)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Action for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }

            fn output_key(self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }
        }
    };
}

domain_actions! {
    /// Actions available for a YouTube URL
    YoutubeAction {
        Video => ("video", "video"),
        Audio => ("audio", "audio"),
        Summary => ("summary", "summary"),
    }
}

domain_actions! {
    /// Actions available for a local video file
    VideoAction {
        Audio => ("audio", "audio"),
        Summary => ("summary", "summary"),
    }
}

domain_actions! {
    /// Actions available for a local audio file
    AudioAction {
        Convert => ("convert", "converted"),
        Summary => ("summary", "summary"),
    }
}

domain_actions! {
    /// Actions available for an image file
    ImageAction {
        Ocr => ("ocr", "text"),
        ToPdf => ("to-pdf", "pdf"),
        ToDocx => ("to-docx", "docx"),
        Convert => ("convert", "converted"),
    }
}

domain_actions! {
    /// Actions available for a text file
    TextAction {
        Summarize => ("summarize", "summary"),
        Tts => ("tts", "audio"),
        ToPdf => ("to-pdf", "pdf"),
        ToImage => ("to-image", "image"),
    }
}

/// Payload of the `youtube` plugin
#[derive(Debug, Clone, Deserialize)]
pub struct YoutubePayload {
    pub url: String,
    pub actions: Vec<String>,
    #[serde(default = "default_video_quality")]
    pub video_quality: String,
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    #[serde(default)]
    pub summary_length: SummaryLength,
}

impl YoutubePayload {
    /// Maximum video height requested by `video_quality` (`"720p"` -> 720)
    pub fn max_height(&self) -> u32 {
        parse_quality(&self.video_quality).unwrap_or(720)
    }
}

fn parse_quality(quality: &str) -> Option<u32> {
    let digits = quality.strip_suffix('p').unwrap_or(quality);
    digits.parse::<u32>().ok().filter(|height| *height > 0)
}

impl Payload for YoutubePayload {
    type Action = YoutubeAction;

    const SCHEMA: PayloadSchema = PayloadSchema {
        domain: "youtube",
        required: &["url", "actions"],
        optional: &[
            ("video_quality", Some("720p")),
            ("audio_format", Some("mp3")),
            ("summary_length", Some("short")),
        ],
        actions: &["video", "audio", "summary"],
    };

    fn action_tokens(&self) -> &[String] {
        &self.actions
    }

    fn validate(&self) -> Result<(), ConverterError> {
        utils::validate_and_normalize_url(&self.url).map_err(|e| invalid::<Self>(e.to_string()))?;
        if parse_quality(&self.video_quality).is_none() {
            return Err(invalid::<Self>(format!(
                "video_quality must look like '720p', got '{}'",
                self.video_quality
            )));
        }
        check_format::<Self>("audio_format", &self.audio_format)
    }
}

/// Payload of the `video` plugin
#[derive(Debug, Clone, Deserialize)]
pub struct VideoPayload {
    pub input_path: String,
    pub actions: Vec<String>,
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    #[serde(default)]
    pub summary_length: SummaryLength,
}

impl Payload for VideoPayload {
    type Action = VideoAction;

    const SCHEMA: PayloadSchema = PayloadSchema {
        domain: "video",
        required: &["input_path", "actions"],
        optional: &[("audio_format", Some("mp3")), ("summary_length", Some("short"))],
        actions: &["audio", "summary"],
    };

    fn action_tokens(&self) -> &[String] {
        &self.actions
    }

    fn validate(&self) -> Result<(), ConverterError> {
        check_input_path::<Self>(&self.input_path)?;
        check_format::<Self>("audio_format", &self.audio_format)
    }
}

/// Payload of the `audio` plugin
#[derive(Debug, Clone, Deserialize)]
pub struct AudioPayload {
    pub input_path: String,
    pub actions: Vec<String>,
    #[serde(default = "default_audio_format")]
    pub target_format: String,
    #[serde(default)]
    pub summary_length: SummaryLength,
}

impl Payload for AudioPayload {
    type Action = AudioAction;

    const SCHEMA: PayloadSchema = PayloadSchema {
        domain: "audio",
        required: &["input_path", "actions"],
        optional: &[("target_format", Some("mp3")), ("summary_length", Some("short"))],
        actions: &["convert", "summary"],
    };

    fn action_tokens(&self) -> &[String] {
        &self.actions
    }

    fn validate(&self) -> Result<(), ConverterError> {
        check_input_path::<Self>(&self.input_path)?;
        check_format::<Self>("target_format", &self.target_format)
    }
}

/// Payload of the `image` plugin
#[derive(Debug, Clone, Deserialize)]
pub struct ImagePayload {
    pub input_path: String,
    pub actions: Vec<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub target_format: Option<String>,
}

/// Treats `""` and whitespace-only strings like a missing field
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

impl Payload for ImagePayload {
    type Action = ImageAction;

    const SCHEMA: PayloadSchema = PayloadSchema {
        domain: "image",
        required: &["input_path", "actions"],
        optional: &[("target_format", None)],
        actions: &["ocr", "to-pdf", "to-docx", "convert"],
    };

    fn action_tokens(&self) -> &[String] {
        &self.actions
    }

    fn validate(&self) -> Result<(), ConverterError> {
        check_input_path::<Self>(&self.input_path)?;
        match &self.target_format {
            Some(format) => check_format::<Self>("target_format", format),
            None => Ok(()),
        }
    }
}

/// Payload of the `text` plugin
#[derive(Debug, Clone, Deserialize)]
pub struct TextPayload {
    pub input_path: String,
    pub actions: Vec<String>,
    #[serde(default)]
    pub summary_length: SummaryLength,
    #[serde(default = "default_audio_format")]
    pub tts_format: String,
}

impl Payload for TextPayload {
    type Action = TextAction;

    const SCHEMA: PayloadSchema = PayloadSchema {
        domain: "text",
        required: &["input_path", "actions"],
        optional: &[("summary_length", Some("short")), ("tts_format", Some("mp3"))],
        actions: &["summarize", "tts", "to-pdf", "to-image"],
    };

    fn action_tokens(&self) -> &[String] {
        &self.actions
    }

    fn validate(&self) -> Result<(), ConverterError> {
        check_input_path::<Self>(&self.input_path)?;
        check_format::<Self>("tts_format", &self.tts_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn raw(value: Value) -> RawPayload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn test_defaults_are_applied() {
        let payload = assert_ok!(YoutubePayload::from_raw(raw(json!({
            "url": "https://www.youtube.com/watch?v=abc",
            "actions": ["video"],
        }))));

        assert_eq!(payload.video_quality, "720p");
        assert_eq!(payload.audio_format, "mp3");
        assert_eq!(payload.summary_length, SummaryLength::Short);
        assert_eq!(payload.max_height(), 720);

        let image = ImagePayload::from_raw(raw(json!({"input_path": "in.jpg", "actions": ["convert"]}))).unwrap();
        assert_eq!(image.target_format, None);
    }

    #[test]
    fn test_blank_target_format_is_absent() {
        for blank in [json!(""), json!("  "), json!(null)] {
            let image = assert_ok!(ImagePayload::from_raw(raw(json!({
                "input_path": "in.jpg",
                "actions": ["ocr"],
                "target_format": blank,
            }))));
            assert_eq!(image.target_format, None);
        }

        let image = assert_ok!(ImagePayload::from_raw(raw(json!({
            "input_path": "in.jpg",
            "actions": ["convert"],
            "target_format": " webp ",
        }))));
        assert_eq!(image.target_format.as_deref(), Some("webp"));
    }

    #[test]
    fn test_missing_input_path_is_rejected() {
        let err = AudioPayload::from_raw(raw(json!({"actions": ["convert"]}))).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Invalid audio payload"), "{message}");
        assert!(message.contains("input_path"), "{message}");
    }

    #[test]
    fn test_actions_must_be_strings() {
        let err = TextPayload::from_raw(raw(json!({"input_path": "in.txt", "actions": "summarize"}))).unwrap_err();
        assert!(matches!(err, ConverterError::InvalidPayload { domain: "text", .. }));

        let err = TextPayload::from_raw(raw(json!({"input_path": "in.txt", "actions": [1, 2]}))).unwrap_err();
        assert!(matches!(err, ConverterError::InvalidPayload { domain: "text", .. }));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let payload = VideoPayload::from_raw(raw(json!({
            "input_path": "clip.mp4",
            "actions": ["audio"],
            "colour": "blue",
        })))
        .unwrap();
        assert_eq!(payload.input_path, "clip.mp4");
    }

    #[test]
    fn test_requested_actions_skip_unknown_and_duplicates() {
        let payload = ImagePayload::from_raw(raw(json!({
            "input_path": "in.jpg",
            "actions": ["to-pdf", "sharpen", "ocr", "to-pdf"],
        })))
        .unwrap();

        assert_eq!(payload.requested_actions(), vec![ImageAction::ToPdf, ImageAction::Ocr]);
    }

    #[test]
    fn test_summary_length_values() {
        let payload = AudioPayload::from_raw(raw(json!({
            "input_path": "in.wav",
            "actions": ["summary"],
            "summary_length": "detailed",
        })))
        .unwrap();
        assert_eq!(payload.summary_length, SummaryLength::Detailed);

        let err = AudioPayload::from_raw(raw(json!({
            "input_path": "in.wav",
            "actions": ["summary"],
            "summary_length": "medium",
        })))
        .unwrap_err();
        assert!(err.to_string().contains("medium"));
    }

    #[test]
    fn test_youtube_validation() {
        assert_err!(YoutubePayload::from_raw(raw(json!({"url": "not-a-url", "actions": ["video"]}))));
        assert_err!(YoutubePayload::from_raw(raw(json!({
            "url": "https://youtu.be/abc",
            "actions": ["video"],
            "video_quality": "hd",
        }))));

        let numeric = assert_ok!(YoutubePayload::from_raw(raw(json!({
            "url": "https://youtu.be/abc",
            "actions": ["video"],
            "video_quality": "1080",
        }))));
        assert_eq!(numeric.max_height(), 1080);
    }

    #[test]
    fn test_format_fields_are_checked() {
        let err = TextPayload::from_raw(raw(json!({
            "input_path": "in.txt",
            "actions": ["tts"],
            "tts_format": "../mp3",
        })))
        .unwrap_err();
        assert!(err.to_string().contains("tts_format"));

        let err = VideoPayload::from_raw(raw(json!({"input_path": "  ", "actions": []}))).unwrap_err();
        assert!(err.to_string().contains("input_path"));
    }

    #[test]
    fn test_schema_matches_action_vocabulary() {
        fn tokens<A: Action>() -> Vec<&'static str> {
            A::ALL.iter().map(|a| a.token()).collect()
        }
        assert_eq!(tokens::<YoutubeAction>(), YoutubePayload::SCHEMA.actions);
        assert_eq!(tokens::<VideoAction>(), VideoPayload::SCHEMA.actions);
        assert_eq!(tokens::<AudioAction>(), AudioPayload::SCHEMA.actions);
        assert_eq!(tokens::<ImageAction>(), ImagePayload::SCHEMA.actions);
        assert_eq!(tokens::<TextAction>(), TextPayload::SCHEMA.actions);
    }
}
