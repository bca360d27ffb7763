//! Plugin API definitions

use anyhow::Result;

use crate::core::config::HostConfig;
use crate::core::document::Editor;
use crate::core::vault::{NodeKind, Vault};

/// Context provided to plugin hooks
pub struct PluginContext<'a> {
    /// Storage tree of the open vault
    pub vault: &'a mut dyn Vault,
    /// Host application configuration
    pub host: &'a HostConfig,
    /// Vault path of the active document
    pub active_file: Option<&'a str>,
}

/// Plugin trait that all plugins must implement
pub trait Plugin {
    /// Stable identifier, also the settings folder name
    fn id(&self) -> &str;

    /// Get the plugin name
    fn name(&self) -> &str;

    /// Get the plugin version
    fn version(&self) -> &str;

    /// Called when the plugin is loaded with its persisted settings, if any
    fn on_load(&mut self, _settings: Option<serde_json::Value>) -> Result<()> {
        Ok(())
    }

    /// Settings to persist on unload
    fn settings(&self) -> Option<serde_json::Value> {
        None
    }

    /// Called when the plugin is unloaded
    fn on_unload(&mut self) {}

    /// A file or folder appeared in the vault
    fn on_create(&mut self, _ctx: &mut PluginContext<'_>, _path: &str, _kind: NodeKind) -> Result<()> {
        Ok(())
    }

    /// A file or folder was removed from the vault
    fn on_delete(&mut self, _ctx: &mut PluginContext<'_>, _path: &str) -> Result<()> {
        Ok(())
    }

    /// A file or folder moved from `old_path` to `path`
    fn on_rename(&mut self, _ctx: &mut PluginContext<'_>, _path: &str, _old_path: &str) -> Result<()> {
        Ok(())
    }

    /// File content changed on storage
    fn on_modify(&mut self, _ctx: &mut PluginContext<'_>, _path: &str) -> Result<()> {
        Ok(())
    }

    /// A document was opened
    fn on_file_open(&mut self, _ctx: &mut PluginContext<'_>, _path: &str) -> Result<()> {
        Ok(())
    }

    /// A document was closed
    fn on_file_close(&mut self, _path: &str) {}

    /// The text of an open document changed under the cursor
    fn on_editor_change(
        &mut self,
        _ctx: &mut PluginContext<'_>,
        _editor: &mut dyn Editor,
        _path: &str,
    ) -> Result<()> {
        Ok(())
    }
}

/// Lifecycle events emitted by the host's storage tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A file or folder was created
    Create { path: String, kind: NodeKind },
    /// A file or folder was deleted
    Delete { path: String },
    /// A file or folder was renamed
    Rename { path: String, old_path: String },
    /// A file was written
    Modify { path: String },
}

impl HostEvent {
    /// Vault path the event is about
    pub fn path(&self) -> &str {
        match self {
            Self::Create { path, .. }
            | Self::Delete { path }
            | Self::Rename { path, .. }
            | Self::Modify { path } => path,
        }
    }
}
