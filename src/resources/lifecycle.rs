//! Resource folders following their documents through create, delete and rename

use anyhow::{Context, Result};

use super::{rewriter, ResourceSync};
use crate::core::vault::{self, Node, Vault};
use crate::plugin::api::PluginContext;

impl ResourceSync {
    pub(super) fn handle_create(&mut self, ctx: &mut PluginContext<'_>, path: &str) -> Result<()> {
        if self.layout.is_document(path) {
            self.ensure_resource_folder(ctx.vault, path)?;
        } else if self.layout.is_image(path) && ctx.host.attachment_folder_path.is_some() {
            self.relocate_screenshot(ctx, path)?;
        }
        Ok(())
    }

    /// Create the resource folder of `document` unless something is already
    /// there. Returns the folder path.
    pub(super) fn ensure_resource_folder(&self, vault: &mut dyn Vault, document: &str) -> Result<String> {
        let folder = self.layout.resource_path_by(document);
        if !vault.exists(&folder) {
            vault
                .create_folder(&folder)
                .with_context(|| format!("Failed to create resource folder {}", folder))?;
            tracing::info!("Created resource folder {} for {}", folder, document);
        }
        Ok(folder)
    }

    pub(super) fn handle_delete(&mut self, ctx: &mut PluginContext<'_>, path: &str) -> Result<()> {
        if !self.layout.is_document(path) {
            return Ok(());
        }
        self.contexts.remove(path);

        let folder = self.layout.resource_path_by(path);
        if !ctx.vault.is_folder(&folder) {
            tracing::debug!("No resource folder for deleted {}", path);
            return Ok(());
        }

        let children = ctx.vault.children(&folder)?;
        let (nested, own): (Vec<Node>, Vec<Node>) = children
            .into_iter()
            .partition(|n| self.is_owned_folder(&*ctx.vault, n));

        if nested.is_empty() {
            ctx.vault
                .delete(&folder, true)
                .with_context(|| format!("Failed to delete resource folder {}", folder))?;
            tracing::info!("Deleted resource folder {}", folder);
            self.prune_empty_ancestors(ctx.vault, &folder)
        } else {
            // Nested documents still own sub-folders; only drop our files.
            for node in own {
                ctx.vault.delete(&node.path, true)?;
            }
            tracing::info!(
                "Emptied resource folder {}, keeping {} nested folder(s)",
                folder,
                nested.len()
            );
            Ok(())
        }
    }

    pub(super) fn handle_rename(
        &mut self,
        ctx: &mut PluginContext<'_>,
        path: &str,
        old_path: &str,
    ) -> Result<()> {
        match (self.layout.is_document(old_path), self.layout.is_document(path)) {
            (false, false) => return Ok(()),
            (true, false) => return self.handle_delete(ctx, old_path),
            (false, true) => return self.handle_create(ctx, path),
            (true, true) => {}
        }

        self.contexts.rename(old_path, path);
        let old_folder = self.layout.resource_path_by(old_path);
        let new_folder = self.layout.resource_path_by(path);
        if old_folder == new_folder || !ctx.vault.is_folder(&old_folder) {
            self.ensure_resource_folder(ctx.vault, path)?;
            return Ok(());
        }

        let kept = self.move_resource_folder(ctx.vault, &old_folder, &new_folder)?;
        self.prune_empty_ancestors(ctx.vault, &old_folder)?;
        self.retarget_references(ctx.vault, path, &old_folder, &new_folder, &kept)
    }

    /// Move the files of `old` to `new`. Sub-folders owned by other documents
    /// stay where they are; their names are returned.
    fn move_resource_folder(&self, vault: &mut dyn Vault, old: &str, new: &str) -> Result<Vec<String>> {
        let children = vault.children(old)?;
        let kept: Vec<String> = children
            .iter()
            .filter(|n| self.is_owned_folder(&*vault, n))
            .map(|n| n.name.clone())
            .collect();
        let into_itself = new.starts_with(&format!("{}/", old));

        // On case-insensitive storage `new` may be `old` itself. Step aside
        // first so the merge below never sees the folder as its own target.
        if kept.is_empty() && old != new && old.eq_ignore_ascii_case(new) && vault.exists(new) {
            let staged = free_sibling(&*vault, old);
            vault
                .rename(old, &staged)
                .with_context(|| format!("Failed to move resource folder {} to {}", old, staged))?;
            return self.move_resource_folder(vault, &staged, new);
        }

        if kept.is_empty() && !into_itself && !vault.exists(new) {
            vault
                .rename(old, new)
                .with_context(|| format!("Failed to move resource folder {} to {}", old, new))?;
            tracing::info!("Moved resource folder {} to {}", old, new);
            return Ok(kept);
        }

        if !vault.exists(new) {
            vault.create_folder(new)?;
        }
        for child in children {
            if kept.contains(&child.name) || child.path == new {
                continue;
            }
            let target = vault::join(new, &child.name);
            if vault.exists(&target) {
                tracing::warn!("{} already exists, dropping {}", target, child.path);
                continue;
            }
            vault.rename(&child.path, &target)?;
        }
        if kept.is_empty() && !into_itself {
            vault.delete(old, true)?;
        }
        tracing::info!("Merged resource folder {} into {}", old, new);
        Ok(kept)
    }

    /// Point image links in the renamed document at its new resource folder.
    /// Links into `kept` sub-folders, which did not move, are left alone.
    fn retarget_references(
        &mut self,
        vault: &mut dyn Vault,
        document: &str,
        old_folder: &str,
        new_folder: &str,
        kept: &[String],
    ) -> Result<()> {
        if !vault.is_file(document) {
            return Ok(());
        }
        let content = vault.read(document)?;
        if let Some(updated) = rewriter::retarget(&content, old_folder, new_folder, kept) {
            vault.write(document, &updated)?;
            tracing::info!("Updated image links in {}", document);
            self.contexts.set_snapshot(document, updated);
        }
        Ok(())
    }

    /// Walk up from a deleted resource folder removing ancestors left empty.
    /// Stops at the resource root, at the first ancestor with children, and
    /// at ancestors that are resource folders of existing documents.
    fn prune_empty_ancestors(&self, vault: &mut dyn Vault, folder: &str) -> Result<()> {
        let mut current = vault::parent(folder).map(str::to_string);
        while let Some(dir) = current {
            if dir == self.layout.root() || !self.layout.is_inside_root(&dir) {
                break;
            }
            if !vault.is_folder(&dir) || !vault.children(&dir)?.is_empty() {
                break;
            }
            if self.layout.owner_documents(&dir).iter().any(|d| vault.is_file(d)) {
                break;
            }
            vault.delete(&dir, false)?;
            tracing::debug!("Pruned empty resource folder {}", dir);
            current = vault::parent(&dir).map(str::to_string);
        }
        Ok(())
    }

    /// A sub-folder that is the resource folder of an existing document
    fn is_owned_folder(&self, vault: &dyn Vault, node: &Node) -> bool {
        node.is_folder()
            && self
                .layout
                .owner_documents(&node.path)
                .iter()
                .any(|d| vault.is_file(d))
    }
}

/// An unused sibling name for `path`
fn free_sibling(vault: &dyn Vault, path: &str) -> String {
    let mut candidate = format!("{}.moving", path);
    let mut n = 1;
    while vault.exists(&candidate) {
        candidate = format!("{}.moving-{}", path, n);
        n += 1;
    }
    candidate
}
