//! Resource folder synchronization
//!
//! Every document `notes/a.md` owns the folder `resources/notes/a`. The
//! folder follows the document through create, rename and delete, pasted
//! screenshots are moved into it, and images whose links disappear from the
//! document are deleted.

pub mod diff;
pub mod lifecycle;
pub mod path;
pub mod rewriter;
pub mod screenshot;
pub mod state;

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::core::document::Editor;
use crate::core::vault::NodeKind;
use crate::plugin::api::{Plugin, PluginContext};
use path::ResourceLayout;
use state::{DocumentContexts, ResourceSettings};

pub const PLUGIN_ID: &str = "vault-resources";

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// The resource synchronization plugin
pub struct ResourceSync {
    settings: ResourceSettings,
    layout: ResourceLayout,
    contexts: DocumentContexts,
    clock: fn() -> NaiveDateTime,
}

impl Default for ResourceSync {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSync {
    pub fn new() -> Self {
        let settings = ResourceSettings::default();
        let layout = ResourceLayout::new(&settings.resource_root);
        Self {
            settings,
            layout,
            contexts: DocumentContexts::default(),
            clock: local_now,
        }
    }

    /// Use another clock for screenshot names
    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(test)]
    pub fn layout(&self) -> &ResourceLayout {
        &self.layout
    }

    #[cfg(test)]
    pub fn contexts(&self) -> &DocumentContexts {
        &self.contexts
    }
}

impl Plugin for ResourceSync {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Vault Resources"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn on_load(&mut self, settings: Option<serde_json::Value>) -> Result<()> {
        self.settings = match settings.map(serde_json::from_value::<ResourceSettings>) {
            Some(Ok(settings)) => settings,
            Some(Err(e)) => {
                tracing::warn!("Invalid settings, using defaults: {}", e);
                ResourceSettings::default()
            }
            None => ResourceSettings::default(),
        };
        self.layout = ResourceLayout::new(&self.settings.resource_root);
        tracing::info!("Resource folders live under {}/", self.layout.root());
        Ok(())
    }

    fn settings(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.settings).ok()
    }

    fn on_unload(&mut self) {
        tracing::debug!("Dropping {} document context(s)", self.contexts.len());
        self.contexts = DocumentContexts::default();
    }

    fn on_create(&mut self, ctx: &mut PluginContext<'_>, path: &str, kind: NodeKind) -> Result<()> {
        if kind == NodeKind::Folder {
            return Ok(());
        }
        self.handle_create(ctx, path)
    }

    fn on_delete(&mut self, ctx: &mut PluginContext<'_>, path: &str) -> Result<()> {
        self.handle_delete(ctx, path)
    }

    fn on_rename(&mut self, ctx: &mut PluginContext<'_>, path: &str, old_path: &str) -> Result<()> {
        self.handle_rename(ctx, path, old_path)
    }

    fn on_modify(&mut self, ctx: &mut PluginContext<'_>, path: &str) -> Result<()> {
        self.handle_modify(ctx, path)
    }

    fn on_file_open(&mut self, ctx: &mut PluginContext<'_>, path: &str) -> Result<()> {
        self.handle_file_open(ctx, path)
    }

    fn on_file_close(&mut self, path: &str) {
        self.contexts.remove(path);
    }

    fn on_editor_change(
        &mut self,
        _ctx: &mut PluginContext<'_>,
        editor: &mut dyn Editor,
        path: &str,
    ) -> Result<()> {
        self.handle_editor_change(editor, path);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::NaiveDateTime;

    use super::ResourceSync;
    use crate::core::config::HostConfig;
    use crate::core::document::Document;
    use crate::core::memory::MemoryVault;
    use crate::core::vault::{NodeKind, Vault};
    use crate::plugin::api::{Plugin, PluginContext};

    /// A memory vault wired to a `ResourceSync`, with helpers that mutate the
    /// vault and then deliver the matching host event.
    pub struct Harness {
        pub vault: MemoryVault,
        pub host: HostConfig,
        pub sync: ResourceSync,
        pub active: Option<String>,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                vault: MemoryVault::new(),
                host: HostConfig::default(),
                sync: ResourceSync::new(),
                active: None,
            }
        }

        pub fn with_attachments(folder: &str) -> Self {
            let mut harness = Self::new();
            harness.host.attachment_folder_path = Some(folder.to_string());
            harness
        }

        pub fn clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
            self.sync = self.sync.with_clock(clock);
            self
        }

        fn run<F>(&mut self, hook: F)
        where
            F: FnOnce(&mut ResourceSync, &mut PluginContext<'_>) -> anyhow::Result<()>,
        {
            let mut ctx = PluginContext {
                vault: &mut self.vault,
                host: &self.host,
                active_file: self.active.as_deref(),
            };
            hook(&mut self.sync, &mut ctx).unwrap();
        }

        pub fn create_document(&mut self, path: &str, content: &str) {
            self.create_file(path, content);
        }

        pub fn create_file(&mut self, path: &str, content: &str) {
            self.vault.write(path, content).unwrap();
            self.notify_created(path);
        }

        pub fn notify_created(&mut self, path: &str) {
            self.run(|sync, ctx| sync.on_create(ctx, path, NodeKind::File));
        }

        pub fn open(&mut self, path: &str) {
            self.active = Some(path.to_string());
            self.run(|sync, ctx| sync.on_file_open(ctx, path));
        }

        pub fn edit(&mut self, path: &str, content: &str) {
            self.vault.write(path, content).unwrap();
            self.notify_modified(path);
        }

        pub fn notify_modified(&mut self, path: &str) {
            self.run(|sync, ctx| sync.on_modify(ctx, path));
        }

        pub fn delete(&mut self, path: &str) {
            self.vault.delete(path, true).unwrap();
            self.run(|sync, ctx| sync.on_delete(ctx, path));
        }

        pub fn rename(&mut self, old_path: &str, path: &str) {
            self.vault.rename(old_path, path).unwrap();
            self.run(|sync, ctx| sync.on_rename(ctx, path, old_path));
        }

        pub fn editor_change(&mut self, doc: &mut Document) {
            let path = doc.path.clone();
            self.run(|sync, ctx| sync.on_editor_change(ctx, doc, &path));
        }
    }
}
