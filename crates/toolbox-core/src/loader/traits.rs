//! Module loader trait and the loaded module handle

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{ModuleId, TypeInfo};

/// Errors that can occur while loading one module
///
/// A load error never aborts a discovery pass; the module is skipped and the
/// error recorded as a diagnostic.
#[derive(Error, Debug)]
pub enum ModuleLoadError {
    #[error("failed to read module {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The module could not be parsed or its metadata is inconsistent
    #[error("corrupt module {}: {message}", .path.display())]
    Corrupt { path: PathBuf, message: String },

    /// The module was written in a metadata format this loader does not read
    #[error("incompatible module {}: format {found}, supported {supported}", .path.display())]
    Incompatible {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("module {} is missing dependency {dependency}", .path.display())]
    MissingDependency { path: PathBuf, dependency: String },

    /// The loader panicked while reading the module
    #[error("loader panicked while reading {}", .path.display())]
    LoaderPanicked { path: PathBuf },
}

impl ModuleLoadError {
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ModuleLoadError::Io { path, .. }
            | ModuleLoadError::Corrupt { path, .. }
            | ModuleLoadError::Incompatible { path, .. }
            | ModuleLoadError::MissingDependency { path, .. }
            | ModuleLoadError::LoaderPanicked { path } => path,
        }
    }
}

pub type LoadResult<T> = Result<T, ModuleLoadError>;

/// An opened, inspectable module
///
/// Owns the module's type catalog for the duration of one discovery pass.
#[derive(Debug, Clone)]
pub struct ModuleHandle {
    id: ModuleId,
    version: Option<String>,
    types: Vec<TypeInfo>,
    dependencies: Vec<PathBuf>,
}

impl ModuleHandle {
    pub fn new(id: ModuleId, types: Vec<TypeInfo>) -> Self {
        Self {
            id,
            version: None,
            types,
            dependencies: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Paths of the modules this one depends on
    pub fn with_dependencies(mut self, dependencies: Vec<PathBuf>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Types declared directly in the module, in declaration order
    pub fn types(&self) -> &[TypeInfo] {
        &self.types
    }

    pub fn dependencies(&self) -> &[PathBuf] {
        &self.dependencies
    }

    /// Find a declared type by full name
    pub fn find_type(&self, full_name: &str) -> Option<&TypeInfo> {
        self.types.iter().find(|t| t.full_name == full_name)
    }
}

/// Loads a module file into an inspectable form
///
/// Implementations:
/// - `ManifestModuleLoader`: JSON metadata tables
/// - host adapters reading native binary formats
pub trait ModuleLoader: Send + Sync {
    /// Loader name, for logs
    fn name(&self) -> &str;

    /// Load the module at `path`
    fn load(&self, path: &Path) -> LoadResult<ModuleHandle>;
}

/// Load `path` with `loader`, turning a panic into `LoaderPanicked`
pub fn load_guarded(loader: &dyn ModuleLoader, path: &Path) -> LoadResult<ModuleHandle> {
    catch_unwind(AssertUnwindSafe(|| loader.load(path))).map_err(|_| {
        ModuleLoadError::LoaderPanicked {
            path: path.to_path_buf(),
        }
    })?
}
