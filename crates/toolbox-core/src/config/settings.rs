//! Discovery settings
//!
//! Everything that parameterizes a discovery pass: where to look, which files are
//! modules, which capability marks a tool, and the attribute names carrying the
//! packaging override and the group label.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::traits::{ConfigError, ConfigResult};

pub const DEFAULT_MODULE_EXTENSION: &str = "tmod";
pub const DEFAULT_COMPONENT_CAPABILITY: &str = "component";
pub const DEFAULT_PACKAGING_CAPABILITY: &str = "toolbox-item";
pub const DEFAULT_PACKAGING_ATTRIBUTE: &str = "ToolboxItem";
pub const DEFAULT_GROUP_ATTRIBUTE: &str = "ToolboxTabName";
pub const DEFAULT_GROUP: &str = "General";

/// A directory to scan for modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRoot {
    pub path: PathBuf,
    /// When set, the root itself is not scanned; each immediate child directory
    /// whose name starts with the prefix is scanned instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
}

impl ModuleRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name_prefix: None,
        }
    }

    /// Restrict the root to child directories starting with `prefix`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }
}

impl From<PathBuf> for ModuleRoot {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for ModuleRoot {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

/// What to do when a subdirectory below a root cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalPolicy {
    /// Abort the pass with the error
    #[default]
    Propagate,
    /// Skip the subtree and record a diagnostic
    Skip,
}

/// Settings for a discovery pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub roots: Vec<ModuleRoot>,
    /// Module file extension, without the leading dot
    pub module_extension: String,
    /// Accept tool types that are not publicly visible
    pub allow_non_public: bool,
    /// Capability a type must implement to be a tool
    pub component_capability: String,
    /// Capability implemented by packaging types
    pub packaging_capability: String,
    /// Attribute naming the packaging override
    pub packaging_attribute: String,
    /// Attribute whose first argument is the group label
    pub group_attribute: String,
    /// Group label used when a type declares none
    pub default_group: String,
    pub traversal: TraversalPolicy,
    /// Modules loaded in parallel by the background pass
    pub concurrency: usize,
    /// Bumped by the host whenever installed content must be refreshed
    pub content_version: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            module_extension: DEFAULT_MODULE_EXTENSION.to_string(),
            allow_non_public: false,
            component_capability: DEFAULT_COMPONENT_CAPABILITY.to_string(),
            packaging_capability: DEFAULT_PACKAGING_CAPABILITY.to_string(),
            packaging_attribute: DEFAULT_PACKAGING_ATTRIBUTE.to_string(),
            group_attribute: DEFAULT_GROUP_ATTRIBUTE.to_string(),
            default_group: DEFAULT_GROUP.to_string(),
            traversal: TraversalPolicy::Propagate,
            concurrency: 4,
            content_version: 1,
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: impl Into<ModuleRoot>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.module_extension = extension.into();
        self
    }

    pub fn with_non_public(mut self) -> Self {
        self.allow_non_public = true;
        self
    }

    pub fn with_default_group(mut self, group: impl Into<String>) -> Self {
        self.default_group = group.into();
        self
    }

    pub fn with_traversal(mut self, policy: TraversalPolicy) -> Self {
        self.traversal = policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Module extension with any leading dot removed
    pub fn extension(&self) -> &str {
        self.module_extension.trim_start_matches('.')
    }

    /// Check the settings are usable
    pub fn validate(&self) -> ConfigResult<()> {
        if self.extension().is_empty() {
            return Err(ConfigError::Invalid("module_extension must not be empty".to_string()));
        }
        let required = [
            ("component_capability", &self.component_capability),
            ("packaging_capability", &self.packaging_capability),
            ("packaging_attribute", &self.packaging_attribute),
            ("group_attribute", &self.group_attribute),
            ("default_group", &self.default_group),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}
