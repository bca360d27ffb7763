//! Relocation of pasted screenshots into the active document's resource folder

use anyhow::{Context, Result};
use chrono::NaiveDateTime;

use super::ResourceSync;
use crate::core::vault::{self, Node, Vault};
use crate::plugin::api::PluginContext;

/// Timestamp file stem, `YYYY-MM-DD-HH-mm-ss`
pub fn screenshot_stem(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%d-%H-%M-%S").to_string()
}

impl ResourceSync {
    /// Move a freshly pasted image from the staging folder into the active
    /// document's resource folder. Returns the new path when a move happened.
    pub(super) fn relocate_screenshot(
        &mut self,
        ctx: &mut PluginContext<'_>,
        created: &str,
    ) -> Result<Option<String>> {
        if self.layout.is_inside_root(created) {
            tracing::debug!("{} is already a resource", created);
            return Ok(None);
        }
        let Some(active) = ctx.active_file.filter(|a| self.layout.is_document(a)) else {
            tracing::debug!("No active document, leaving {} in place", created);
            return Ok(None);
        };
        let Some(staging) = ctx.host.staging_folder(Some(active)) else {
            return Ok(None);
        };
        if !ctx.vault.is_folder(&staging) {
            tracing::debug!("Attachment folder {:?} does not exist", staging);
            return Ok(None);
        }
        if vault::parent(created) != Some(staging.as_str()) {
            tracing::debug!("{} was not pasted into {:?}", created, staging);
            return Ok(None);
        }

        let Some(screenshot) = self.staged_image(ctx.vault, &staging, created)? else {
            tracing::debug!("No staged image in {:?}", staging);
            return Ok(None);
        };

        let folder = self.ensure_resource_folder(ctx.vault, active)?;
        if ctx.vault.exists(&vault::join(&folder, &screenshot.name)) {
            tracing::debug!("{} already holds {}", folder, screenshot.name);
            return Ok(None);
        }

        let ext = screenshot.extension().unwrap_or("png").to_lowercase();
        let target = free_name(ctx.vault, &folder, &screenshot_stem((self.clock)()), &ext);
        ctx.vault
            .rename(&screenshot.path, &target)
            .with_context(|| format!("Failed to move {} to {}", screenshot.path, target))?;
        tracing::info!("Moved screenshot {} to {}", screenshot.path, target);

        self.contexts.set_pending_screenshot(active, target.clone());
        Ok(Some(target))
    }

    /// The image that was just pasted: the one named like the created file,
    /// else the most recently modified image in the staging folder.
    fn staged_image(&self, vault: &dyn Vault, staging: &str, created: &str) -> Result<Option<Node>> {
        let images: Vec<Node> = vault
            .children(staging)?
            .into_iter()
            .filter(|n| n.is_file() && self.layout.is_image(&n.path))
            .collect();

        let named = images.iter().find(|n| n.path == created);
        Ok(named
            .or_else(|| images.iter().max_by_key(|n| n.modified))
            .cloned())
    }
}

/// `folder/stem.ext`, or `folder/stem-N.ext` when taken
fn free_name(vault: &dyn Vault, folder: &str, stem: &str, ext: &str) -> String {
    let mut candidate = vault::join(folder, &format!("{}.{}", stem, ext));
    let mut n = 1;
    while vault.exists(&candidate) {
        candidate = vault::join(folder, &format!("{}-{}.{}", stem, n, ext));
        n += 1;
    }
    candidate
}
