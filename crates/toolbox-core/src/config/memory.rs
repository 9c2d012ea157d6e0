//! In-memory configuration provider

use async_trait::async_trait;
use parking_lot::RwLock;

use super::settings::DiscoveryConfig;
use super::traits::{ConfigProvider, ConfigResult};

/// In-memory configuration provider
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    config: RwLock<DiscoveryConfig>,
}

impl MemoryConfigProvider {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    async fn load(&self) -> ConfigResult<DiscoveryConfig> {
        Ok(self.config.read().clone())
    }

    async fn save(&self, config: &DiscoveryConfig) -> ConfigResult<()> {
        config.validate()?;
        *self.config.write() = config.clone();
        Ok(())
    }
}
