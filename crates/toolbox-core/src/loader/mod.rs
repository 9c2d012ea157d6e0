//! Module loading
//!
//! Turns a module file into a `ModuleHandle` exposing the module's declared types.
//! The `ModuleLoader` trait is the seam for binary formats; the shipped
//! `ManifestModuleLoader` reads JSON metadata tables.

mod traits;
mod manifest;

pub use traits::{load_guarded, LoadResult, ModuleHandle, ModuleLoadError, ModuleLoader};
pub use manifest::{ManifestModuleLoader, SUPPORTED_FORMAT};
