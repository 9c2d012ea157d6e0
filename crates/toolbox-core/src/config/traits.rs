//! Configuration provider trait

use async_trait::async_trait;

use super::settings::DiscoveryConfig;

/// Source of discovery settings
///
/// Implementations:
/// - `MemoryConfigProvider`: in-memory, for tests and embedding hosts
/// - `FileConfigProvider`: YAML file (~/.config/toolbox/config.yaml)
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Load the current settings
    async fn load(&self) -> ConfigResult<DiscoveryConfig>;

    /// Replace the stored settings
    async fn save(&self, config: &DiscoveryConfig) -> ConfigResult<()>;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
