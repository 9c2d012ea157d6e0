//! In-memory registry

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{RegistryError, RegistryResult, ToolRegistry};
use crate::types::Descriptor;

/// A descriptor as installed, with the group it was added under
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledTool {
    pub descriptor: Descriptor,
    pub group: String,
}

/// Registry kept in memory, in installation order
///
/// Rejects duplicate adds and removals of unknown items. Used by the CLI dry run
/// and by tests, which can also make it refuse specific tool types.
#[derive(Debug, Default)]
pub struct MemoryToolRegistry {
    installed: RwLock<Vec<InstalledTool>>,
    rejected: RwLock<HashSet<String>>,
}

impl MemoryToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every add and remove of `tool_type`
    pub fn reject(&self, tool_type: impl Into<String>) {
        self.rejected.write().insert(tool_type.into());
    }

    /// Snapshot of the installed tools
    pub fn items(&self) -> Vec<InstalledTool> {
        self.installed.read().clone()
    }

    pub fn contains(&self, tool_type: &str) -> bool {
        self.installed
            .read()
            .iter()
            .any(|t| t.descriptor.tool_type == tool_type)
    }

    /// Group `tool_type` was installed under
    pub fn group_of(&self, tool_type: &str) -> Option<String> {
        self.installed
            .read()
            .iter()
            .find(|t| t.descriptor.tool_type == tool_type)
            .map(|t| t.group.clone())
    }

    pub fn len(&self) -> usize {
        self.installed.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.read().is_empty()
    }

    fn check_rejected(&self, descriptor: &Descriptor) -> RegistryResult<()> {
        if self.rejected.read().contains(&descriptor.tool_type) {
            return Err(RegistryError::rejected(&descriptor.tool_type, "refused by registry"));
        }
        Ok(())
    }
}

#[async_trait]
impl ToolRegistry for MemoryToolRegistry {
    fn name(&self) -> &str {
        "memory"
    }

    async fn add(&self, descriptor: &Descriptor, group: &str) -> RegistryResult<()> {
        self.check_rejected(descriptor)?;
        let mut installed = self.installed.write();
        if installed.iter().any(|t| t.descriptor.tool_type == descriptor.tool_type) {
            return Err(RegistryError::AlreadyInstalled {
                tool_type: descriptor.tool_type.clone(),
            });
        }
        installed.push(InstalledTool {
            descriptor: descriptor.clone(),
            group: group.to_string(),
        });
        Ok(())
    }

    async fn remove(&self, descriptor: &Descriptor) -> RegistryResult<()> {
        self.check_rejected(descriptor)?;
        let mut installed = self.installed.write();
        let position = installed
            .iter()
            .position(|t| t.descriptor.tool_type == descriptor.tool_type)
            .ok_or_else(|| RegistryError::NotInstalled {
                tool_type: descriptor.tool_type.clone(),
            })?;
        installed.remove(position);
        Ok(())
    }
}
