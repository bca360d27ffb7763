//! Plugin manager for loading plugins and dispatching host events

use anyhow::{Context, Result};

use super::api::{HostEvent, Plugin, PluginContext};
use crate::core::document::Editor;
use crate::core::vault::{self, Vault};

/// Plugin manager
pub struct PluginManager {
    /// Host configuration folder, relative to the vault root
    config_dir: String,
    /// Loaded plugins in registration order
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginManager {
    /// Create a new plugin manager
    pub fn new(config_dir: impl Into<String>) -> Self {
        Self {
            config_dir: vault::normalize(&config_dir.into()),
            plugins: Vec::new(),
        }
    }

    /// Vault path of a plugin's persisted settings
    pub fn data_path(&self, id: &str) -> String {
        format!("{}/plugins/{}/data.json", self.config_dir, id)
    }

    /// Load a plugin's settings and register it
    pub fn enable_plugin(&mut self, mut plugin: Box<dyn Plugin>, vault: &dyn Vault) -> Result<()> {
        let data = self.load_data(plugin.id(), vault);
        plugin
            .on_load(data)
            .with_context(|| format!("Failed to load plugin {}", plugin.id()))?;
        tracing::info!("Loaded plugin: {} v{}", plugin.name(), plugin.version());
        self.plugins.push(plugin);
        Ok(())
    }

    /// Persisted settings, or `None` when missing or unreadable
    fn load_data(&self, id: &str, vault: &dyn Vault) -> Option<serde_json::Value> {
        let path = self.data_path(id);
        if !vault.is_file(&path) {
            return None;
        }
        match vault
            .read(&path)
            .map_err(anyhow::Error::from)
            .and_then(|content| Ok(serde_json::from_str::<serde_json::Value>(&content)?))
        {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring settings of plugin {}: {}", id, e);
                None
            }
        }
    }

    /// Save every plugin's settings and unload them
    pub fn unload_all(&mut self, vault: &mut dyn Vault) {
        for mut plugin in self.plugins.drain(..) {
            if let Some(settings) = plugin.settings() {
                let path = format!("{}/plugins/{}/data.json", self.config_dir, plugin.id());
                let saved = serde_json::to_string_pretty(&settings)
                    .map_err(anyhow::Error::from)
                    .and_then(|content| Ok(vault.write(&path, &content)?));
                if let Err(e) = saved {
                    tracing::error!("Failed to save settings of plugin {}: {}", plugin.id(), e);
                }
            }
            plugin.on_unload();
            tracing::info!("Unloaded plugin: {}", plugin.id());
        }
    }

    /// Route a storage lifecycle event to every plugin
    pub fn dispatch(&mut self, ctx: &mut PluginContext<'_>, event: &HostEvent) {
        for plugin in &mut self.plugins {
            let result = match event {
                HostEvent::Create { path, kind } => plugin.on_create(ctx, path, *kind),
                HostEvent::Delete { path } => plugin.on_delete(ctx, path),
                HostEvent::Rename { path, old_path } => plugin.on_rename(ctx, path, old_path),
                HostEvent::Modify { path } => plugin.on_modify(ctx, path),
            };
            report(plugin.id(), event.path(), result);
        }
    }

    /// Notify plugins that a document was opened
    pub fn on_file_open(&mut self, ctx: &mut PluginContext<'_>, path: &str) {
        for plugin in &mut self.plugins {
            tracing::debug!("Notifying plugin {} of document open", plugin.id());
            let result = plugin.on_file_open(ctx, path);
            report(plugin.id(), path, result);
        }
    }

    /// Notify plugins that a document was closed
    pub fn on_file_close(&mut self, path: &str) {
        for plugin in &mut self.plugins {
            plugin.on_file_close(path);
        }
    }

    /// Notify plugins of an edit in an open document
    pub fn on_editor_change(&mut self, ctx: &mut PluginContext<'_>, editor: &mut dyn Editor, path: &str) {
        for plugin in &mut self.plugins {
            let result = plugin.on_editor_change(ctx, editor, path);
            report(plugin.id(), path, result);
        }
    }

    /// Get plugin count
    #[cfg(test)]
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }
}

/// Hook failures surface in the log; the host keeps running
fn report(id: &str, path: &str, result: Result<()>) {
    if let Err(e) = result {
        tracing::error!("Plugin {} failed on {}: {:#}", id, path, e);
    }
}
