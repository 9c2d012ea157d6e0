//! Descriptor resolution for eligible types

mod descriptor_resolver;
mod error;

pub use descriptor_resolver::{DescriptorResolver, PackagingOverride, ResolverSettings};
pub use error::{ResolutionError, ResolveResult};
