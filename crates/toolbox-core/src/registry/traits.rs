//! Registry trait definition

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Descriptor;

/// Errors reported by a registry for a single descriptor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{tool_type} is already installed")]
    AlreadyInstalled { tool_type: String },

    #[error("{tool_type} is not installed")]
    NotInstalled { tool_type: String },

    /// The host refused the descriptor
    #[error("registry rejected {tool_type}: {message}")]
    Rejected { tool_type: String, message: String },

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

impl RegistryError {
    pub fn rejected(tool_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            tool_type: tool_type.into(),
            message: message.into(),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Host store of installed descriptors
///
/// Calls are async so an adapter can hop to the host's UI thread before touching
/// the real toolbox.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Registry name, for logs
    fn name(&self) -> &str;

    /// Add `descriptor` under the group label `group`
    async fn add(&self, descriptor: &Descriptor, group: &str) -> RegistryResult<()>;

    /// Remove a previously added descriptor
    async fn remove(&self, descriptor: &Descriptor) -> RegistryResult<()>;
}
