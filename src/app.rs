//! Application state and event dispatch

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::core::config::HostConfig;
use crate::core::document::{self, Document};
use crate::core::vault::{self, NodeKind, Vault};
use crate::plugin::{HostEvent, Plugin, PluginContext, PluginManager};

/// A vault with its open documents and plugins
pub struct SyncApp<V: Vault> {
    /// Storage tree of the vault
    vault: V,
    /// Host configuration folder, relative to the vault root
    config_dir: String,
    /// Host application configuration
    host: HostConfig,
    /// Plugin manager
    plugins: PluginManager,
    /// Open documents indexed by vault path
    documents: HashMap<String, Document>,
    /// Currently active document path
    active_document: Option<String>,
}

impl<V: Vault> SyncApp<V> {
    /// Create an application over `vault` with no plugins enabled
    pub fn new(vault: V, config_dir: &str) -> Self {
        let config_dir = vault::normalize(config_dir);
        let host = HostConfig::load(&vault, &config_dir).unwrap_or_else(|e| {
            tracing::warn!("Ignoring host configuration: {:#}", e);
            HostConfig::default()
        });
        if host.attachment_folder_path.is_none() {
            tracing::info!("No attachment folder configured, pasted images stay in place");
        }

        Self {
            vault,
            plugins: PluginManager::new(config_dir.clone()),
            config_dir,
            host,
            documents: HashMap::new(),
            active_document: None,
        }
    }

    pub fn enable_plugin(&mut self, plugin: Box<dyn Plugin>) -> Result<()> {
        self.plugins.enable_plugin(plugin, &self.vault)
    }

    #[cfg(test)]
    pub fn vault(&self) -> &V {
        &self.vault
    }

    #[cfg(test)]
    pub fn vault_mut(&mut self) -> &mut V {
        &mut self.vault
    }

    #[cfg(test)]
    pub fn host(&self) -> &HostConfig {
        &self.host
    }

    #[cfg(test)]
    pub fn active_document(&self) -> Option<&str> {
        self.active_document.as_deref()
    }

    /// Open existing documents so later edits have something to diff against
    pub fn open_documents(&mut self, paths: impl IntoIterator<Item = String>) {
        let mut count = 0;
        for path in paths {
            if self.load_document(&path) {
                count += 1;
            }
        }
        tracing::info!("Opened {} document(s)", count);
    }

    /// Open a document and make it active
    pub fn open_document(&mut self, path: &str) {
        if self.documents.contains_key(path) || self.load_document(path) {
            self.active_document = Some(path.to_string());
        }
    }

    fn load_document(&mut self, path: &str) -> bool {
        match self.vault.read(path) {
            Ok(content) => {
                self.documents
                    .insert(path.to_string(), Document::new(path, &content));
                let mut ctx = PluginContext {
                    vault: &mut self.vault,
                    host: &self.host,
                    active_file: self.active_document.as_deref(),
                };
                self.plugins.on_file_open(&mut ctx, path);
                true
            }
            Err(e) => {
                tracing::error!("Failed to open document {}: {}", path, e);
                false
            }
        }
    }

    /// Close a document
    pub fn close_document(&mut self, path: &str) {
        if self.documents.remove(path).is_some() {
            self.plugins.on_file_close(path);
        }
        if self.active_document.as_deref() == Some(path) {
            self.active_document = None;
        }
    }

    /// Handle one host event to completion
    pub fn handle(&mut self, event: HostEvent) {
        tracing::debug!("{:?}", event);

        if event.path() == HostConfig::path(&self.config_dir) {
            if !matches!(event, HostEvent::Delete { .. }) {
                self.reload_host_config();
            }
            return;
        }

        match &event {
            HostEvent::Create { path, kind } => {
                self.dispatch(&event);
                if *kind == NodeKind::File && document::is_markdown(path) {
                    self.open_document(path);
                }
            }
            HostEvent::Delete { path } => {
                // A deleted folder takes its open documents with it
                let prefix = format!("{}/", path);
                let mut nested: Vec<String> = self
                    .documents
                    .keys()
                    .filter(|doc| doc.starts_with(&prefix))
                    .cloned()
                    .collect();
                nested.sort();
                for doc in nested {
                    self.dispatch(&HostEvent::Delete { path: doc.clone() });
                    self.close_document(&doc);
                }
                self.dispatch(&event);
                self.close_document(path);
            }
            HostEvent::Rename { path, old_path } => {
                if let Some(mut doc) = self.documents.remove(old_path) {
                    doc.path = path.clone();
                    self.documents.insert(path.clone(), doc);
                }
                if self.active_document.as_deref() == Some(old_path.as_str()) {
                    self.active_document = Some(path.clone());
                }
                self.dispatch(&event);
            }
            HostEvent::Modify { path } => {
                self.dispatch(&event);
                self.after_modify(path);
            }
        }
    }

    fn dispatch(&mut self, event: &HostEvent) {
        let mut ctx = PluginContext {
            vault: &mut self.vault,
            host: &self.host,
            active_file: self.active_document.as_deref(),
        };
        self.plugins.dispatch(&mut ctx, event);
    }

    /// Turn a document write into an editor change at the last edited line,
    /// and write back whatever plugins changed.
    fn after_modify(&mut self, path: &str) {
        if !document::is_markdown(path) {
            return;
        }
        let content = match self.vault.read(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Cannot read modified {}: {}", path, e);
                return;
            }
        };
        let Some(previous) = self.documents.get(path).map(Document::content) else {
            self.open_document(path);
            return;
        };
        if previous == content {
            return;
        }

        self.active_document = Some(path.to_string());
        let mut doc = Document::new(path, &content).with_cursor_after_edit(&previous);
        let mut ctx = PluginContext {
            vault: &mut self.vault,
            host: &self.host,
            active_file: self.active_document.as_deref(),
        };
        self.plugins.on_editor_change(&mut ctx, &mut doc, path);

        if doc.modified {
            if let Err(e) = self.vault.write(path, &doc.content()) {
                tracing::error!("Failed to save document {}: {}", path, e);
            }
            doc.modified = false;
        }
        self.documents.insert(path.to_string(), doc);
    }

    fn reload_host_config(&mut self) {
        match HostConfig::load(&self.vault, &self.config_dir) {
            Ok(host) => {
                if host != self.host {
                    tracing::info!("Host configuration changed: {:?}", host);
                }
                self.host = host;
            }
            Err(e) => tracing::warn!("Keeping previous host configuration: {:#}", e),
        }
    }

    /// Process events until the channel closes or Ctrl-C
    pub async fn run(mut self, mut events: UnboundedReceiver<HostEvent>) -> Result<()> {
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                result = &mut shutdown => {
                    result?;
                    tracing::info!("Shutting down");
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Unload plugins, saving their settings
    pub fn shutdown(&mut self) {
        self.plugins.unload_all(&mut self.vault);
        self.documents.clear();
        self.active_document = None;
    }
}
