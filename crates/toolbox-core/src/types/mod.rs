//! Core types shared across the discovery pipeline

mod type_info;
mod descriptor;
mod cancellation;

pub use type_info::{AttributeData, ConstructorSig, TypeInfo, Visibility};
pub use descriptor::{Descriptor, ModuleId, OverrideConstructor, PackagingSource, GROUP_NAME_KEY};
pub use cancellation::CancellationToken;
