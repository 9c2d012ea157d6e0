//! File-based configuration provider (YAML)
//!
//! Supports user-level (~/.config/toolbox/config.yaml) and workspace-level
//! (.config/toolbox/config.yaml) config.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::settings::DiscoveryConfig;
use super::traits::{ConfigProvider, ConfigResult};

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/toolbox/config.yaml)
    User,
    /// Workspace-level config (.config/toolbox/config.yaml in workspace root)
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// File-based configuration provider
///
/// A missing file loads as the default settings. Loaded settings are cached until
/// `reload` or `save`.
///
/// # Example
///
/// ```no_run
/// use toolbox_core::config::FileConfigProvider;
///
/// let user_config = FileConfigProvider::user();
/// let workspace_config = FileConfigProvider::workspace("/path/to/workspace");
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<DiscoveryConfig>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// Create a user-level config provider
    pub fn user() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        Self::new(config_dir.join("toolbox").join("config.yaml"), ConfigLevel::User)
    }

    /// Create a workspace-level config provider
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root.as_ref().join(".config").join("toolbox").join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_file(&self) -> ConfigResult<DiscoveryConfig> {
        if !self.path.exists() {
            return Ok(DiscoveryConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let config: DiscoveryConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn write_file(&self, config: &DiscoveryConfig) -> ConfigResult<()> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(config)?;
        fs::write(&self.path, content)?;

        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    fn cached(&self) -> ConfigResult<DiscoveryConfig> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<DiscoveryConfig> {
        let config = self.read_file()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Copy the current file next to itself, returning the backup path
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load(&self) -> ConfigResult<DiscoveryConfig> {
        self.cached()
    }

    async fn save(&self, config: &DiscoveryConfig) -> ConfigResult<()> {
        self.write_file(config)
    }
}
