//! Toolbox Core
//!
//! Discovers installable tool types inside a tree of modules and keeps a host's
//! toolbox registry in step with them. Nothing here assumes a particular host:
//! the registry, the logger and the module format are all traits.
//!
//! ## Discovery
//!
//! ```rust,ignore
//! use toolbox_core::{DiscoveryConfig, DiscoveryEngine, MemoryToolRegistry, ModuleRoot};
//!
//! let config = DiscoveryConfig::default().with_root("/opt/acme/modules");
//! let engine = DiscoveryEngine::new(&config, logger);
//!
//! let result = engine.discover(&config.roots)?;
//! for diagnostic in result.diagnostics() {
//!     eprintln!("{}", diagnostic);
//! }
//!
//! let report = engine.install(&result, &registry).await;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod scanner;
pub mod loader;
pub mod filter;
pub mod packaging;
pub mod resolver;
pub mod registry;
pub mod engine;
pub mod sync;

// Re-export commonly used types
pub use types::{
    AttributeData, ConstructorSig, TypeInfo, Visibility,
    Descriptor, ModuleId, OverrideConstructor, PackagingSource, GROUP_NAME_KEY,
    CancellationToken,
};

pub use logging::{Logger, NoOpLogger, ConsoleLogger};

pub use config::{
    ConfigProvider, ConfigError, ConfigResult, FileConfigProvider, MemoryConfigProvider,
    DiscoveryConfig, ModuleRoot, TraversalPolicy,
};

pub use scanner::{ModulePathScanner, ScanError, ScanResult};

pub use loader::{
    load_guarded, LoadResult, ManifestModuleLoader, ModuleHandle, ModuleLoadError, ModuleLoader,
};

pub use filter::CapabilityPredicate;

pub use packaging::{PackagedItem, PackagingDefinition, PackagingRegistry};

pub use resolver::{DescriptorResolver, ResolutionError, ResolveResult};

pub use registry::{
    MemoryToolRegistry, RegistryError, RegistryReport, RegistryResult, ToolRegistry,
};

pub use engine::{Diagnostic, DiagnosticKind, DiscoveryEngine, DiscoveryError, DiscoveryResult};

pub use sync::{SyncOutcome, ToolboxSync};
