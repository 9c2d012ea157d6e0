//! Configuration: discovery settings and where they come from

mod traits;
mod settings;
mod memory;
mod file;

pub use traits::{ConfigProvider, ConfigError, ConfigResult};
pub use settings::{
    DiscoveryConfig, ModuleRoot, TraversalPolicy,
    DEFAULT_COMPONENT_CAPABILITY, DEFAULT_GROUP, DEFAULT_GROUP_ATTRIBUTE,
    DEFAULT_MODULE_EXTENSION, DEFAULT_PACKAGING_ATTRIBUTE, DEFAULT_PACKAGING_CAPABILITY,
};
pub use memory::MemoryConfigProvider;
pub use file::{FileConfigProvider, ConfigLevel};
