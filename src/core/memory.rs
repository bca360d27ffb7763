//! In-memory vault used to exercise the sync engine without touching disk

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use super::vault::{self, Node, NodeKind, Vault, VaultError, VaultResult};

#[derive(Debug, Clone)]
enum Entry {
    Folder,
    File { content: String, modified: SystemTime },
}

/// Vault kept in a sorted map. Modification times come from a counter so
/// that "newest" is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryVault {
    entries: BTreeMap<String, Entry>,
    clock: u64,
    fold_case: bool,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// A vault that resolves names case-insensitively, like the default
    /// filesystems of macOS and Windows. Paths are stored lowercased.
    pub fn case_insensitive() -> Self {
        Self {
            fold_case: true,
            ..Self::default()
        }
    }

    fn key(&self, path: &str) -> String {
        let path = vault::normalize(path);
        if self.fold_case {
            path.to_lowercase()
        } else {
            path
        }
    }

    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.clock)
    }

    fn ensure_parents(&mut self, path: &str) {
        let mut current = vault::parent(path);
        while let Some(dir) = current {
            if dir.is_empty() {
                break;
            }
            self.entries.entry(dir.to_string()).or_insert(Entry::Folder);
            current = vault::parent(dir);
        }
    }

    fn descendants(&self, path: &str) -> Vec<String> {
        let prefix = format!("{}/", path);
        self.entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Every path in the vault, sorted
    pub fn paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

impl Vault for MemoryVault {
    fn node(&self, path: &str) -> Option<Node> {
        let path = self.key(path);
        if path.is_empty() {
            return Some(Node::new("", NodeKind::Folder, None));
        }
        self.entries.get(&path).map(|entry| match entry {
            Entry::Folder => Node::new(path.clone(), NodeKind::Folder, None),
            Entry::File { modified, .. } => Node::new(path.clone(), NodeKind::File, Some(*modified)),
        })
    }

    fn children(&self, folder: &str) -> VaultResult<Vec<Node>> {
        let folder = self.key(folder);
        match self.node(&folder) {
            None => return Err(VaultError::NotFound(folder)),
            Some(n) if n.is_file() => return Err(VaultError::NotAFolder(folder)),
            _ => {}
        }
        Ok(self
            .entries
            .keys()
            .filter(|k| vault::parent(k) == Some(folder.as_str()))
            .filter_map(|k| self.node(k))
            .collect())
    }

    fn create_folder(&mut self, path: &str) -> VaultResult<()> {
        let path = self.key(path);
        if let Some(Entry::File { .. }) = self.entries.get(&path) {
            return Err(VaultError::AlreadyExists(path));
        }
        self.ensure_parents(&path);
        self.entries.insert(path, Entry::Folder);
        Ok(())
    }

    fn read(&self, path: &str) -> VaultResult<String> {
        let path = self.key(path);
        match self.entries.get(&path) {
            Some(Entry::File { content, .. }) => Ok(content.clone()),
            Some(Entry::Folder) => Err(VaultError::NotFound(path)),
            None => Err(VaultError::NotFound(path)),
        }
    }

    fn write(&mut self, path: &str, content: &str) -> VaultResult<()> {
        let path = self.key(path);
        if let Some(Entry::Folder) = self.entries.get(&path) {
            return Err(VaultError::AlreadyExists(path));
        }
        self.ensure_parents(&path);
        let modified = self.tick();
        self.entries.insert(
            path,
            Entry::File {
                content: content.to_string(),
                modified,
            },
        );
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> VaultResult<()> {
        let from = self.key(from);
        let to = self.key(to);
        if from == to && self.entries.contains_key(&from) {
            return Ok(());
        }
        if self.entries.contains_key(&to) {
            return Err(VaultError::AlreadyExists(to));
        }
        let entry = self
            .entries
            .remove(&from)
            .ok_or_else(|| VaultError::NotFound(from.clone()))?;
        let moved = self.descendants(&from);

        self.ensure_parents(&to);
        self.entries.insert(to.clone(), entry);
        for old in moved {
            if let Some(child) = self.entries.remove(&old) {
                let new = format!("{}{}", to, &old[from.len()..]);
                self.entries.insert(new, child);
            }
        }
        Ok(())
    }

    fn delete(&mut self, path: &str, recursive: bool) -> VaultResult<()> {
        let path = self.key(path);
        if !self.entries.contains_key(&path) {
            return Err(VaultError::NotFound(path));
        }
        let below = self.descendants(&path);
        if !below.is_empty() && !recursive {
            return Err(VaultError::NotEmpty(path));
        }
        for child in below {
            self.entries.remove(&child);
        }
        self.entries.remove(&path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_moves_subtree() {
        let mut vault = MemoryVault::new();
        vault.write("resources/old/a/x.png", "x").unwrap();
        vault.rename("resources/old/a", "resources/new/a").unwrap();

        assert!(vault.is_file("resources/new/a/x.png"));
        assert!(vault.is_folder("resources/new"));
        assert!(!vault.exists("resources/old/a"));
        assert!(vault.is_folder("resources/old"));
    }

    #[test]
    fn test_delete_requires_recursive_for_non_empty() {
        let mut vault = MemoryVault::new();
        vault.write("a/b.png", "").unwrap();
        assert!(matches!(vault.delete("a", false), Err(VaultError::NotEmpty(_))));
        vault.delete("a", true).unwrap();
        assert!(vault.paths().is_empty());
    }

    #[test]
    fn test_children_are_immediate_only() {
        let mut vault = MemoryVault::new();
        vault.write("a/b/c.png", "").unwrap();
        vault.write("a/d.png", "").unwrap();
        let names: Vec<_> = vault
            .children("a")
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["b".to_string(), "d.png".to_string()]);
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut vault = MemoryVault::case_insensitive();
        vault.write("Notes/A.md", "a").unwrap();
        assert_eq!(vault.read("notes/a.md").unwrap(), "a");
        assert!(vault.is_folder("NOTES"));
        vault.rename("notes/a.md", "Notes/A.md").unwrap();
        assert_eq!(vault.read("NOTES/a.MD").unwrap(), "a");
        vault.rename("notes/a.md", "notes/b.md").unwrap();
        vault.write("x.md", "").unwrap();
        assert!(matches!(
            vault.rename("notes/b.md", "X.md"),
            Err(VaultError::AlreadyExists(_))
        ));
    }
}
