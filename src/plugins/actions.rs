//! Per-call action pipeline shared by every domain plugin.

use anyhow::Context;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{ExecutionResult, ERROR_KEY};
use crate::config::Config;
use crate::utils;
use crate::{ConverterError, Result};

/// Output settings shared by all plugins, taken from configuration
#[derive(Debug, Clone, Default)]
pub struct ActionSettings {
    /// Where outputs go; current directory when unset
    pub output_dir: Option<PathBuf>,

    /// Tag output names with the request id
    pub unique_outputs: bool,

    /// Upper bound for one action
    pub timeout: Option<Duration>,
}

impl ActionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.app.output_dir.clone(),
            unique_outputs: config.app.unique_outputs,
            timeout: config.action_timeout(),
        }
    }
}

/// What one action produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// A file was written
    File(PathBuf),
    /// Inline text result
    Text(String),
    /// Preconditions not met; nothing done
    Skipped(String),
    /// The action failed with a reason
    Failed(String),
}

/// State of a single dispatch call
#[derive(Debug)]
pub struct ActionContext {
    request_id: String,
    output_dir: PathBuf,
    unique_outputs: bool,
    timeout: Option<Duration>,
}

impl ActionContext {
    /// Resolve the output directory to an absolute path and create it
    pub fn new(settings: &ActionSettings) -> Result<Self> {
        let cwd = std::env::current_dir().context("Could not determine current directory")?;
        let output_dir = match &settings.output_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd,
        };
        fs_err::create_dir_all(&output_dir)?;

        Ok(Self {
            request_id: utils::new_request_id(),
            output_dir,
            unique_outputs: settings.unique_outputs,
            timeout: settings.timeout,
        })
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Suffix appended to output names, when unique outputs are on
    pub fn tag(&self) -> Option<String> {
        self.unique_outputs.then(|| self.request_id.clone())
    }

    /// Absolute output path named after `stem`
    pub fn output_path(&self, stem: &str, extension: &str) -> PathBuf {
        let tag = self.tag();
        self.output_dir
            .join(utils::output_file_name(stem, tag.as_deref(), extension))
    }

    /// Absolute output path named after an input file
    pub fn output_path_for(&self, input: &Path, extension: &str) -> PathBuf {
        self.output_path(&utils::file_stem(input), extension)
    }

    /// Run one action, bounded by the configured timeout
    pub async fn run<F>(&self, action: &'static str, work: F) -> ActionOutcome
    where
        F: Future<Output = Result<ActionOutcome>>,
    {
        let started = Instant::now();
        tracing::info!(request = %self.request_id, action, "Running action");

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => Err(ConverterError::ActionTimedOut {
                    action,
                    seconds: limit.as_secs(),
                }
                .into()),
            },
            None => work.await,
        };

        let outcome = result.unwrap_or_else(|e| ActionOutcome::Failed(format!("{:#}", e)));
        match &outcome {
            ActionOutcome::Failed(reason) => {
                tracing::warn!(request = %self.request_id, action, %reason, "Action failed");
            }
            ActionOutcome::Skipped(reason) => {
                tracing::info!(request = %self.request_id, action, %reason, "Action skipped");
            }
            _ => {
                tracing::info!(
                    request = %self.request_id,
                    action,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Action completed"
                );
            }
        }
        outcome
    }
}

/// Collects action outcomes into an envelope
#[derive(Debug, Default)]
pub struct ActionReport {
    outputs: BTreeMap<String, String>,
    failures: Vec<String>,
}

impl ActionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: &str, output_key: &str, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::File(path) => {
                self.outputs
                    .insert(output_key.to_string(), path.to_string_lossy().into_owned());
            }
            ActionOutcome::Text(text) => {
                self.outputs.insert(output_key.to_string(), text);
            }
            ActionOutcome::Skipped(_) => {}
            ActionOutcome::Failed(reason) => {
                self.failures.push(format!("{}: {}", action, reason));
            }
        }
    }

    /// Successful envelope unless some action failed; completed outputs are kept either way
    pub fn into_result(self) -> ExecutionResult {
        if self.failures.is_empty() {
            return ExecutionResult::success(self.outputs);
        }

        let mut outputs = self.outputs;
        outputs.insert(ERROR_KEY.to_string(), self.failures.join("; "));
        ExecutionResult {
            success: false,
            outputs,
        }
    }
}
