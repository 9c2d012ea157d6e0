//! Module path scanning
//!
//! Walks a root directory and yields every file carrying the module extension.
//! Within a directory, files come first in name order, then each subdirectory is
//! walked depth-first, also in name order, so two scans of an unchanged tree yield
//! the same sequence.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::config::{ModuleRoot, TraversalPolicy};

/// Errors raised while enumerating module paths
#[derive(Error, Debug)]
pub enum ScanError {
    /// The root itself cannot be listed
    #[error("module root {} is unreadable: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("module root {} is not a directory", .path.display())]
    NotADirectory { path: PathBuf },

    /// A directory below the root cannot be listed
    #[error("failed to read {}: {message}", .path.display())]
    Subdirectory { path: PathBuf, message: String },
}

impl ScanError {
    /// Path the error refers to
    pub fn path(&self) -> &Path {
        match self {
            ScanError::RootUnreadable { path, .. }
            | ScanError::NotADirectory { path }
            | ScanError::Subdirectory { path, .. } => path,
        }
    }

    fn from_walk(err: walkdir::Error, root: &Path) -> Self {
        let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
        if err.depth() == 0 {
            let message = err.to_string();
            let source = err
                .into_io_error()
                .unwrap_or_else(|| io::Error::other(message));
            return ScanError::RootUnreadable { path, source };
        }
        ScanError::Subdirectory {
            message: err.to_string(),
            path,
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;

/// Enumerates loadable-module paths under root directories
#[derive(Debug, Clone)]
pub struct ModulePathScanner {
    extension: String,
    policy: TraversalPolicy,
}

impl ModulePathScanner {
    /// Create a scanner for files with `extension` (leading dot optional)
    pub fn new(extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_string(),
            policy: TraversalPolicy::Propagate,
        }
    }

    pub fn with_policy(mut self, policy: TraversalPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn policy(&self) -> TraversalPolicy {
        self.policy
    }

    /// Whether `path` carries the module extension (ASCII case-insensitive)
    pub fn is_module_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    /// Directories a root stands for
    ///
    /// A plain root is itself. A root with a name prefix expands to its immediate
    /// child directories whose names start with the prefix, in name order.
    pub fn expand_root(&self, root: &ModuleRoot) -> ScanResult<Vec<PathBuf>> {
        let Some(prefix) = root.name_prefix.as_deref() else {
            return Ok(vec![root.path.clone()]);
        };

        let entries = fs::read_dir(&root.path).map_err(|source| ScanError::RootUnreadable {
            path: root.path.clone(),
            source,
        })?;

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ScanError::RootUnreadable {
                path: root.path.clone(),
                source,
            })?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let matches = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(prefix))
                .unwrap_or(false);
            if is_dir && matches {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Start a fresh traversal of `root`
    ///
    /// Fails immediately when the root is missing, not a directory or unreadable.
    /// The returned sequence is lazy: subdirectories are read as it advances.
    pub fn scan(&self, root: &Path) -> ScanResult<ModuleScan> {
        let metadata = fs::metadata(root).map_err(|source| ScanError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        fs::read_dir(root).map_err(|source| ScanError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by(files_first)
            .into_iter();

        Ok(ModuleScan {
            root: root.to_path_buf(),
            walker,
            scanner: self.clone(),
            skipped: Vec::new(),
        })
    }
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Lazy, non-restartable sequence of module paths under one root
pub struct ModuleScan {
    root: PathBuf,
    walker: walkdir::IntoIter,
    scanner: ModulePathScanner,
    skipped: Vec<ScanError>,
}

impl ModuleScan {
    /// Subtrees skipped so far under `TraversalPolicy::Skip`
    pub fn skipped(&self) -> &[ScanError] {
        &self.skipped
    }

    pub fn into_skipped(self) -> Vec<ScanError> {
        self.skipped
    }
}

impl Iterator for ModuleScan {
    type Item = ScanResult<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.walker.next()? {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.scanner.is_module_path(entry.path()) {
                        return Some(Ok(entry.into_path()));
                    }
                }
                Err(err) => {
                    let error = ScanError::from_walk(err, &self.root);
                    match (&error, self.scanner.policy) {
                        (ScanError::Subdirectory { .. }, TraversalPolicy::Skip) => {
                            self.skipped.push(error);
                        }
                        _ => return Some(Err(error)),
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ModuleScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleScan")
            .field("root", &self.root)
            .field("scanner", &self.scanner)
            .field("skipped", &self.skipped.len())
            .finish()
    }
}
