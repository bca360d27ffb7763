//! Storage tree abstraction shared by every vault backend
//!
//! Paths are vault-relative and slash separated. The vault root is the empty
//! string.

use std::time::SystemTime;

use thiserror::Error;

/// Errors reported by a vault backend
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("no such file or folder: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("folder is not empty: {0}")]
    NotEmpty(String),
    #[error("not a folder: {0}")]
    NotAFolder(String),
    #[error("path leaves the vault: {0}")]
    OutsideVault(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type VaultResult<T> = std::result::Result<T, VaultError>;

/// Kind of a node in the storage tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
}

/// A file or folder in the vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub path: String,
    pub name: String,
    pub kind: NodeKind,
    pub modified: Option<SystemTime>,
}

impl Node {
    pub fn new(path: impl Into<String>, kind: NodeKind, modified: Option<SystemTime>) -> Self {
        let path = path.into();
        let name = file_name(&path).to_string();
        Self {
            path,
            name,
            kind,
            modified,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Extension without the dot, if any
    pub fn extension(&self) -> Option<&str> {
        extension(&self.path)
    }
}

/// Storage tree operations the resource engine relies on
pub trait Vault {
    /// Look up a node by path
    fn node(&self, path: &str) -> Option<Node>;

    /// Immediate children of a folder
    fn children(&self, folder: &str) -> VaultResult<Vec<Node>>;

    /// Create a folder, including missing parents
    fn create_folder(&mut self, path: &str) -> VaultResult<()>;

    /// Read a file as text
    fn read(&self, path: &str) -> VaultResult<String>;

    /// Replace the content of a file, creating it if needed
    fn write(&mut self, path: &str, content: &str) -> VaultResult<()>;

    /// Move a file or folder. Missing parents of `to` are created.
    fn rename(&mut self, from: &str, to: &str) -> VaultResult<()>;

    /// Delete a file or folder. Non-empty folders need `recursive`.
    fn delete(&mut self, path: &str, recursive: bool) -> VaultResult<()>;

    fn exists(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    fn is_folder(&self, path: &str) -> bool {
        self.node(path).map(|n| n.is_folder()).unwrap_or(false)
    }

    fn is_file(&self, path: &str) -> bool {
        self.node(path).map(|n| n.is_file()).unwrap_or(false)
    }
}

/// Strip leading and trailing separators and collapse backslashes
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

/// Whether a path has `.` or `..` segments. Vault paths never do, so a
/// path that has them came from user text and must not reach storage.
pub fn has_dot_segments(path: &str) -> bool {
    path.split(['/', '\\']).any(|part| part == "." || part == "..")
}

/// Join a folder and a child name
pub fn join(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

/// Parent folder of a path; the root has no parent
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rfind('/').map(|i| &path[..i]).unwrap_or(""))
}

/// Last path segment
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some(&name[i + 1..]),
    }
}
