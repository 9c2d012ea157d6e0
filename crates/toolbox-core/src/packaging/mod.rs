//! Packaging types and their constructors
//!
//! A packaging type is what the host actually installs for a tool. Hosts register
//! packaging types by name together with the constructors they expose; the resolver
//! looks an override up here before falling back to packaging types declared in
//! the tool's own module.

mod item;
mod registry;

pub use item::PackagedItem;
pub use registry::{
    DefaultConstructor, PackagingDefinition, PackagingRegistry, TypedConstructor,
};
