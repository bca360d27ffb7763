//! Filesystem watching: `notify` events turned into host lifecycle events

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::{CreateKind, EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use crate::core::config::HostConfig;
use crate::core::file_system::{get_markdown_files, relative_to};
use crate::core::vault::{self, NodeKind};
use crate::plugin::HostEvent;

/// Decides which vault paths produce events
#[derive(Debug, Clone)]
pub struct EventFilter {
    root: PathBuf,
    host_config: String,
}

impl EventFilter {
    pub fn new(root: impl Into<PathBuf>, config_dir: &str) -> Self {
        Self {
            root: root.into(),
            host_config: HostConfig::path(config_dir),
        }
    }

    /// Vault path of `path` unless it is hidden or outside the vault.
    /// The host's `app.json` is let through.
    fn vault_path(&self, path: &Path) -> Option<String> {
        let rel = relative_to(&self.root, path)?;
        if rel.is_empty() {
            return None;
        }
        if rel != self.host_config && rel.split('/').any(|part| part.starts_with('.')) {
            return None;
        }
        Some(rel)
    }
}

/// Watch `root` recursively, sending translated events to `tx`
pub fn watch_vault(
    root: &Path,
    config_dir: &str,
    tx: UnboundedSender<HostEvent>,
) -> Result<RecommendedWatcher> {
    let filter = EventFilter::new(root, config_dir);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                for host_event in translate(&filter, &event) {
                    if tx.send(host_event).is_err() {
                        return;
                    }
                }
            }
            Err(e) => tracing::error!("Watch error: {}", e),
        }
    })
    .context("Failed to create file watcher")?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", root.display()))?;
    tracing::info!("Watching {}", root.display());
    Ok(watcher)
}

/// Translate one `notify` event
pub fn translate(filter: &EventFilter, event: &notify::Event) -> Vec<HostEvent> {
    match event.kind {
        EventKind::Create(kind) => event
            .paths
            .iter()
            .filter_map(|p| created(filter, p, Some(kind)))
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .filter_map(|p| removed(filter, p))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            renamed(filter, &event.paths[0], &event.paths[1])
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .filter_map(|p| removed(filter, p))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .filter_map(|p| created(filter, p, None))
            .collect(),
        // Unpaired renames: whichever side still exists was the target
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter_map(|p| {
                if p.exists() {
                    created(filter, p, None)
                } else {
                    removed(filter, p)
                }
            })
            .collect(),
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => event
            .paths
            .iter()
            .filter(|p| !p.is_dir())
            .filter_map(|p| filter.vault_path(p))
            .map(|path| HostEvent::Modify { path })
            .collect(),
        _ => Vec::new(),
    }
}

fn created(filter: &EventFilter, path: &Path, kind: Option<CreateKind>) -> Option<HostEvent> {
    let kind = match kind {
        Some(CreateKind::Folder) => NodeKind::Folder,
        Some(CreateKind::File) => NodeKind::File,
        _ if path.is_dir() => NodeKind::Folder,
        _ => NodeKind::File,
    };
    Some(HostEvent::Create {
        path: filter.vault_path(path)?,
        kind,
    })
}

fn removed(filter: &EventFilter, path: &Path) -> Option<HostEvent> {
    Some(HostEvent::Delete {
        path: filter.vault_path(path)?,
    })
}

/// A rename, expanded into one rename per markdown file when a folder moved
fn renamed(filter: &EventFilter, from: &Path, to: &Path) -> Vec<HostEvent> {
    let (old_path, path) = match (filter.vault_path(from), filter.vault_path(to)) {
        (Some(old_path), Some(path)) => (old_path, path),
        (None, Some(_)) => return created(filter, to, None).into_iter().collect(),
        (Some(_), None) => return removed(filter, from).into_iter().collect(),
        (None, None) => return Vec::new(),
    };

    let mut events = Vec::new();
    if to.is_dir() {
        for file in get_markdown_files(to) {
            let Some(new_doc) = filter.vault_path(&file) else {
                continue;
            };
            let Some(suffix) = new_doc.strip_prefix(&format!("{}/", path)) else {
                continue;
            };
            events.push(HostEvent::Rename {
                old_path: vault::join(&old_path, suffix),
                path: new_doc,
            });
        }
    }
    events.push(HostEvent::Rename { path, old_path });
    events
}

#[cfg(test)]
mod tests {
    use notify::event::{DataChange, RemoveKind};
    use notify::Event;

    use super::*;

    fn filter(root: &Path) -> EventFilter {
        EventFilter::new(root, ".obsidian")
    }

    #[test]
    fn test_create_remove_and_modify() {
        let root = Path::new("/vault");
        let f = filter(root);

        let create = Event::new(EventKind::Create(CreateKind::File)).add_path(root.join("notes/a.md"));
        assert_eq!(
            translate(&f, &create),
            vec![HostEvent::Create {
                path: "notes/a.md".to_string(),
                kind: NodeKind::File
            }]
        );

        let remove = Event::new(EventKind::Remove(RemoveKind::File)).add_path(root.join("a.md"));
        assert_eq!(
            translate(&f, &remove),
            vec![HostEvent::Delete {
                path: "a.md".to_string()
            }]
        );

        let modify = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(root.join("a.md"));
        assert_eq!(
            translate(&f, &modify),
            vec![HostEvent::Modify {
                path: "a.md".to_string()
            }]
        );
    }

    #[test]
    fn test_hidden_paths_are_filtered() {
        let root = Path::new("/vault");
        let f = filter(root);

        let hidden = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(root.join(".obsidian/workspace.json"))
            .add_path(root.join(".git/index"))
            .add_path(Path::new("/elsewhere/a.md").to_path_buf());
        assert!(translate(&f, &hidden).is_empty());

        let config = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(root.join(".obsidian/app.json"));
        assert_eq!(
            translate(&f, &config),
            vec![HostEvent::Modify {
                path: ".obsidian/app.json".to_string()
            }]
        );
    }

    #[test]
    fn test_file_rename() {
        let root = Path::new("/vault");
        let f = filter(root);
        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(root.join("old/name.md"))
            .add_path(root.join("new/name.md"));
        assert_eq!(
            translate(&f, &rename),
            vec![HostEvent::Rename {
                path: "new/name.md".to_string(),
                old_path: "old/name.md".to_string()
            }]
        );

        let out_of_view = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(root.join("a.md"))
            .add_path(root.join(".trash/a.md"));
        assert_eq!(
            translate(&f, &out_of_view),
            vec![HostEvent::Delete {
                path: "a.md".to_string()
            }]
        );
    }

    #[test]
    fn test_folder_rename_expands_to_documents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("archive/sub")).unwrap();
        std::fs::write(root.join("archive/a.md"), "").unwrap();
        std::fs::write(root.join("archive/sub/b.md"), "").unwrap();
        std::fs::write(root.join("archive/img.png"), "").unwrap();

        let f = filter(root);
        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(root.join("notes"))
            .add_path(root.join("archive"));
        let mut events = translate(&f, &rename);
        let folder = events.pop().unwrap();
        assert_eq!(
            folder,
            HostEvent::Rename {
                path: "archive".to_string(),
                old_path: "notes".to_string()
            }
        );

        events.sort_by(|a, b| a.path().cmp(b.path()));
        assert_eq!(
            events,
            vec![
                HostEvent::Rename {
                    path: "archive/a.md".to_string(),
                    old_path: "notes/a.md".to_string()
                },
                HostEvent::Rename {
                    path: "archive/sub/b.md".to_string(),
                    old_path: "notes/sub/b.md".to_string()
                },
            ]
        );
    }
}
