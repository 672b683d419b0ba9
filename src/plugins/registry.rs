//! Plugin registry
//!
//! The registry is built once at startup by [`PluginRegistry::with_defaults`], which
//! lists every domain plugin in one place. After that it is only read, so it can be
//! shared behind an `Arc` by any number of concurrent dispatch calls.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::actions::ActionSettings;
use super::audio::AudioPlugin;
use super::image::ImagePlugin;
use super::text::TextPlugin;
use super::video::VideoPlugin;
use super::youtube::YoutubePlugin;
use super::Plugin;
use crate::tools::Toolbox;
use crate::{ConverterError, Result};

/// Domain key to handler mapping
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            plugins: HashMap::with_capacity(5),
        }
    }

    /// Registry holding every built-in domain plugin
    pub fn with_defaults(tools: Toolbox, settings: ActionSettings) -> Result<Self> {
        let mut registry = Self::new();

        registry.register(Arc::new(YoutubePlugin::new(tools.clone(), settings.clone())))?;
        registry.register(Arc::new(VideoPlugin::new(tools.clone(), settings.clone())))?;
        registry.register(Arc::new(AudioPlugin::new(tools.clone(), settings.clone())))?;
        registry.register(Arc::new(ImagePlugin::new(tools.clone(), settings.clone())))?;
        registry.register(Arc::new(TextPlugin::new(tools, settings)))?;

        Ok(registry)
    }

    /// Register a plugin under its name and hand it back.
    /// Empty and already-registered keys are rejected.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<Arc<dyn Plugin>> {
        let name = plugin.name();
        if name.trim().is_empty() {
            return Err(ConverterError::EmptyPluginKey.into());
        }
        if self.plugins.contains_key(name) {
            return Err(ConverterError::DuplicatePlugin(name.to_string()).into());
        }

        info!("Registering plugin: {}", name);
        self.plugins.insert(name.to_string(), Arc::clone(&plugin));
        Ok(plugin)
    }

    /// Handler registered under `key`
    pub fn lookup(&self, key: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(key).cloned()
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Registered plugins sorted by key
    pub fn plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.lookup(key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
