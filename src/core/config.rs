//! Application and host configuration management

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::vault::{self, Vault};

/// Default name of the host's configuration folder inside a vault
pub const DEFAULT_CONFIG_DIR: &str = ".obsidian";

/// Daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Last watched vault path
    pub last_vault: Option<PathBuf>,
    /// Recent vaults
    pub recent_vaults: Vec<PathBuf>,
    /// Watcher settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Watcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Host configuration folder, relative to the vault root
    pub config_dir: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            config_dir: DEFAULT_CONFIG_DIR.to_string(),
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "robsidian", "VaultResources")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Add a vault to recent vaults
    pub fn add_recent_vault(&mut self, path: PathBuf) {
        // Remove if already exists
        self.recent_vaults.retain(|p| p != &path);
        // Add to front
        self.recent_vaults.insert(0, path);
        // Keep only last 10
        self.recent_vaults.truncate(10);
    }
}

/// Read-only view of the host's `app.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// Where the host drops new attachments
    #[serde(default)]
    pub attachment_folder_path: Option<String>,
}

impl HostConfig {
    /// Vault path of the host's `app.json`
    pub fn path(config_dir: &str) -> String {
        vault::join(&vault::normalize(config_dir), "app.json")
    }

    /// Load `app.json` from the vault. A missing file means defaults.
    pub fn load(vault: &dyn Vault, config_dir: &str) -> Result<Self> {
        let path = Self::path(config_dir);
        if !vault.is_file(&path) {
            tracing::debug!("No host configuration at {}", path);
            return Ok(Self::default());
        }
        let content = vault.read(&path)?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Resolve the staging folder for attachments pasted into `active`.
    ///
    /// `""` and `"/"` mean the vault root and `./sub` is relative to the
    /// active document's folder. `None` when no attachment folder is set.
    pub fn staging_folder(&self, active: Option<&str>) -> Option<String> {
        let configured = self.attachment_folder_path.as_deref()?.trim();

        let relative = if configured == "." {
            Some("")
        } else {
            configured.strip_prefix("./")
        };
        if let Some(relative) = relative {
            let base = vault::parent(active?).unwrap_or("");
            let relative = vault::normalize(relative);
            return Some(if relative.is_empty() {
                base.to_string()
            } else {
                vault::join(base, &relative)
            });
        }

        Some(vault::normalize(configured))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryVault;

    #[test]
    fn test_add_recent_vault() {
        let mut config = AppConfig::default();
        for i in 0..12 {
            config.add_recent_vault(PathBuf::from(format!("/vaults/{}", i)));
        }
        config.add_recent_vault(PathBuf::from("/vaults/5"));
        assert_eq!(config.recent_vaults.len(), 10);
        assert_eq!(config.recent_vaults[0], PathBuf::from("/vaults/5"));
    }

    #[test]
    fn test_host_config_from_vault() {
        let mut vault = MemoryVault::new();
        assert_eq!(HostConfig::load(&vault, ".obsidian").unwrap(), HostConfig::default());

        vault
            .write(
                ".obsidian/app.json",
                r#"{"attachmentFolderPath": "attachments", "promptDelete": false}"#,
            )
            .unwrap();
        let host = HostConfig::load(&vault, ".obsidian").unwrap();
        assert_eq!(host.attachment_folder_path.as_deref(), Some("attachments"));
    }

    #[test]
    fn test_invalid_host_config_is_an_error() {
        let mut vault = MemoryVault::new();
        vault.write(".obsidian/app.json", "{not json").unwrap();
        assert!(HostConfig::load(&vault, ".obsidian").is_err());
    }

    #[test]
    fn test_staging_folder_resolution() {
        let host = |p: &str| HostConfig {
            attachment_folder_path: Some(p.to_string()),
        };
        assert_eq!(host("attachments").staging_folder(None).as_deref(), Some("attachments"));
        assert_eq!(host("/").staging_folder(None).as_deref(), Some(""));
        assert_eq!(
            host("./assets").staging_folder(Some("notes/a.md")).as_deref(),
            Some("notes/assets")
        );
        assert_eq!(host("./").staging_folder(Some("notes/a.md")).as_deref(), Some("notes"));
        assert_eq!(host("./assets").staging_folder(None), None);
        assert_eq!(HostConfig::default().staging_folder(Some("a.md")), None);
    }
}
