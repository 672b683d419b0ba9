//! Domain plugins and the contract they share with every caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod actions;
pub mod audio;
pub mod dispatch;
pub mod image;
pub mod registry;
pub mod text;
pub mod video;
pub mod youtube;

use crate::payload::{PayloadSchema, RawPayload};
use crate::Result;

/// Key holding the failure message in a failed envelope
pub const ERROR_KEY: &str = "error";

/// Uniform result of every dispatch call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether every requested action completed
    pub success: bool,

    /// Output name to file path or inline text; holds `"error"` on failure
    pub outputs: BTreeMap<String, String>,
}

impl ExecutionResult {
    pub fn success(outputs: BTreeMap<String, String>) -> Self {
        Self { success: true, outputs }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let mut outputs = BTreeMap::new();
        outputs.insert(ERROR_KEY.to_string(), message.into());
        Self { success: false, outputs }
    }

    /// Failure message, if this is a failed envelope
    pub fn error(&self) -> Option<&str> {
        if self.success {
            None
        } else {
            self.outputs.get(ERROR_KEY).map(String::as_str)
        }
    }

    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }
}

/// A domain handler reachable through the dispatcher
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Domain key the plugin is registered under
    fn name(&self) -> &'static str;

    /// One-line description for listings
    fn description(&self) -> &'static str;

    /// Fields and actions the plugin accepts
    fn schema(&self) -> &'static PayloadSchema;

    /// Validate the raw payload and run the requested actions
    async fn run(&self, payload: RawPayload) -> Result<ExecutionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_envelope() {
        let result = ExecutionResult::failure("No plugin 'nope'");
        assert!(!result.success);
        assert_eq!(result.error(), Some("No plugin 'nope'"));
        assert_eq!(result.outputs.len(), 1);
    }

    #[test]
    fn test_success_envelope_has_no_error() {
        let mut outputs = BTreeMap::new();
        outputs.insert("summary".to_string(), "short text".to_string());
        let result = ExecutionResult::success(outputs);
        assert!(result.success);
        assert_eq!(result.error(), None);
        assert_eq!(result.output("summary"), Some("short text"));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ExecutionResult::failure("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "outputs": {"error": "boom"}}));
    }
}
