//! Vault backed by a directory on disk

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::vault::{self, Node, NodeKind, Vault, VaultError, VaultResult};

fn io_error(path: &str) -> impl FnOnce(std::io::Error) -> VaultError + '_ {
    move |source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            VaultError::NotFound(path.to_string())
        } else {
            VaultError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

/// A vault rooted at a directory
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute location of a vault path. Paths that would resolve outside
    /// the root are refused.
    pub fn absolute(&self, path: &str) -> VaultResult<PathBuf> {
        let path = vault::normalize(path);
        if path.is_empty() {
            return Ok(self.root.clone());
        }
        let rel = Path::new(&path);
        if vault::has_dot_segments(&path)
            || rel.components().any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(VaultError::OutsideVault(path));
        }
        Ok(self.root.join(rel))
    }

    /// Vault path of an absolute location, if it lies inside the vault
    pub fn relative(&self, path: &Path) -> Option<String> {
        relative_to(&self.root, path)
    }

    /// Get all markdown files in the vault, skipping hidden folders
    pub fn markdown_files(&self) -> Vec<String> {
        get_markdown_files(&self.root)
            .iter()
            .filter_map(|p| self.relative(p))
            .collect()
    }
}

/// Vault path of `path` relative to `root`
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}

/// Get all markdown files in a directory recursively
pub fn get_markdown_files(path: &Path) -> Vec<PathBuf> {
    WalkDir::new(path)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .map(|ext| ext == "md" || ext == "markdown")
                    .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}

impl Vault for FsVault {
    fn node(&self, path: &str) -> Option<Node> {
        let meta = fs::metadata(self.absolute(path).ok()?).ok()?;
        let kind = if meta.is_dir() {
            NodeKind::Folder
        } else {
            NodeKind::File
        };
        Some(Node::new(vault::normalize(path), kind, meta.modified().ok()))
    }

    fn children(&self, folder: &str) -> VaultResult<Vec<Node>> {
        let folder = vault::normalize(folder);
        let abs = self.absolute(&folder)?;
        if abs.is_file() {
            return Err(VaultError::NotAFolder(folder));
        }
        let entries = fs::read_dir(&abs).map_err(io_error(&folder))?;

        let mut nodes = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let kind = if meta.is_dir() {
                NodeKind::Folder
            } else {
                NodeKind::File
            };
            nodes.push(Node::new(vault::join(&folder, &name), kind, meta.modified().ok()));
        }
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nodes)
    }

    fn create_folder(&mut self, path: &str) -> VaultResult<()> {
        let abs = self.absolute(path)?;
        if abs.is_file() {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }
        fs::create_dir_all(&abs).map_err(io_error(path))
    }

    fn read(&self, path: &str) -> VaultResult<String> {
        fs::read_to_string(self.absolute(path)?).map_err(io_error(path))
    }

    fn write(&mut self, path: &str, content: &str) -> VaultResult<()> {
        let abs = self.absolute(path)?;
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).map_err(io_error(path))?;
        }
        fs::write(&abs, content).map_err(io_error(path))
    }

    fn rename(&mut self, from: &str, to: &str) -> VaultResult<()> {
        let source = self.absolute(from)?;
        let target = self.absolute(to)?;
        if target.exists() {
            return Err(VaultError::AlreadyExists(to.to_string()));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_error(to))?;
        }
        fs::rename(&source, &target).map_err(io_error(from))
    }

    fn delete(&mut self, path: &str, recursive: bool) -> VaultResult<()> {
        let abs = self.absolute(path)?;
        if abs.is_dir() {
            if recursive {
                fs::remove_dir_all(&abs).map_err(io_error(path))
            } else {
                fs::remove_dir(&abs).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::DirectoryNotEmpty {
                        VaultError::NotEmpty(path.to_string())
                    } else {
                        io_error(path)(e)
                    }
                })
            }
        } else {
            fs::remove_file(&abs).map_err(io_error(path))
        }
    }
}
