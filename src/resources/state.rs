//! Per-document state and persisted settings

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::path::DEFAULT_RESOURCE_ROOT;

/// Settings persisted in the plugin's `data.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceSettings {
    pub my_setting: String,
    /// Folder holding every resource folder
    pub resource_root: String,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            my_setting: "default".to_string(),
            resource_root: DEFAULT_RESOURCE_ROOT.to_string(),
        }
    }
}

/// What the engine remembers about one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentContext {
    /// Content as of the last read, the "before" side of the next diff
    pub snapshot: Option<String>,
    /// Relocated screenshot waiting for its placeholder to be rewritten
    pub pending_screenshot: Option<String>,
}

/// Document contexts keyed by vault path
#[derive(Debug, Clone, Default)]
pub struct DocumentContexts {
    by_path: HashMap<String, DocumentContext>,
}

impl DocumentContexts {
    pub fn get(&self, path: &str) -> Option<&DocumentContext> {
        self.by_path.get(path)
    }

    pub fn snapshot(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|c| c.snapshot.as_deref())
    }

    pub fn set_snapshot(&mut self, path: &str, content: String) {
        self.by_path.entry(path.to_string()).or_default().snapshot = Some(content);
    }

    pub fn set_pending_screenshot(&mut self, path: &str, screenshot: String) {
        self.by_path.entry(path.to_string()).or_default().pending_screenshot = Some(screenshot);
    }

    /// Consume the pending screenshot of a document
    pub fn take_pending_screenshot(&mut self, path: &str) -> Option<String> {
        self.by_path
            .get_mut(path)
            .and_then(|c| c.pending_screenshot.take())
            .filter(|p| !p.is_empty())
    }

    /// Carry a document's context over to its new path
    pub fn rename(&mut self, old_path: &str, new_path: &str) {
        if let Some(context) = self.by_path.remove(old_path) {
            self.by_path.insert(new_path.to_string(), context);
        }
    }

    pub fn remove(&mut self, path: &str) -> Option<DocumentContext> {
        self.by_path.remove(path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }
}
