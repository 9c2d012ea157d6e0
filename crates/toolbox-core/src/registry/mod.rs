//! Host-side tool registry
//!
//! The registry is owned by the host. Discovery only ever talks to it through the
//! [`ToolRegistry`] trait, one descriptor at a time.

mod memory;
mod report;
mod traits;

pub use memory::{InstalledTool, MemoryToolRegistry};
pub use report::{RegistryFailure, RegistryOperation, RegistryReport};
pub use traits::{RegistryError, RegistryResult, ToolRegistry};
