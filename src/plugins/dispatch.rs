//! Dispatch a raw payload to the plugin registered for its domain.
//!
//! [`Dispatcher::run`] never returns an error and never unwinds: unknown keys,
//! payload errors, plugin errors and plugin panics all come back as a failed
//! [`ExecutionResult`].

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::registry::PluginRegistry;
use super::ExecutionResult;
use crate::payload::RawPayload;
use crate::ConverterError;

/// Routes dispatch calls through a shared, read-only registry
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
}

impl Dispatcher {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Run the plugin registered under `key` on `payload`
    pub async fn run(&self, key: &str, payload: RawPayload) -> ExecutionResult {
        let Some(plugin) = self.registry.lookup(key) else {
            let err = ConverterError::UnknownPlugin(key.to_string());
            warn!("{}", err);
            return ExecutionResult::failure(err.to_string());
        };

        let started = Instant::now();
        info!("Dispatching to plugin '{}'", key);

        let result = match AssertUnwindSafe(plugin.run(payload)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!("Plugin '{}' failed: {:#}", key, e);
                ExecutionResult::failure(format!("{:#}", e))
            }
            Err(panic) => {
                let message = extract_panic_message(panic.as_ref());
                error!(message = %message, "Plugin '{}' panicked", key);
                ExecutionResult::failure(ConverterError::PluginPanicked(message).to_string())
            }
        };

        info!(
            success = result.success,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Plugin '{}' finished",
            key
        );
        result
    }
}

fn extract_panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
