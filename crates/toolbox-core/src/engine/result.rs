//! Discovery result set and diagnostics

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::loader::ModuleLoadError;
use crate::resolver::ResolutionError;
use crate::scanner::ScanError;
use crate::types::{Descriptor, ModuleId};

/// Stage a contained failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A subtree was skipped while scanning
    Traversal,
    ModuleLoad,
    Resolution,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Traversal => write!(f, "traversal"),
            DiagnosticKind::ModuleLoad => write!(f, "module load"),
            DiagnosticKind::Resolution => write!(f, "resolution"),
        }
    }
}

/// A failure that was contained instead of aborting the pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub path: PathBuf,
    /// Type being resolved, for resolution failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn traversal(error: &ScanError) -> Self {
        Self {
            kind: DiagnosticKind::Traversal,
            path: error.path().to_path_buf(),
            type_name: None,
            message: error.to_string(),
        }
    }

    pub fn module_load(error: &ModuleLoadError) -> Self {
        Self {
            kind: DiagnosticKind::ModuleLoad,
            path: error.path().to_path_buf(),
            type_name: None,
            message: error.to_string(),
        }
    }

    pub fn resolution(path: &Path, type_name: &str, error: &ResolutionError) -> Self {
        Self {
            kind: DiagnosticKind::Resolution,
            path: path.to_path_buf(),
            type_name: Some(type_name.to_string()),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_name {
            Some(type_name) => write!(
                f,
                "{} failure in {} ({}): {}",
                self.kind,
                self.path.display(),
                type_name,
                self.message
            ),
            None => write!(f, "{} failure in {}: {}", self.kind, self.path.display(), self.message),
        }
    }
}

/// Everything one module contributed to a pass
#[derive(Debug, Clone, Default)]
pub struct ModuleOutcome {
    pub path: PathBuf,
    /// Identity of the loaded module; `None` when loading failed
    pub module: Option<ModuleId>,
    pub descriptors: Vec<Descriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ModuleOutcome {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Ordered, deduplicated descriptors from one discovery pass
///
/// Descriptors keep first-discovered order; a descriptor whose tool type was
/// already seen is dropped. Owned by the caller; installing or uninstalling it
/// does not change it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryResult {
    descriptors: Vec<Descriptor>,
    diagnostics: Vec<Diagnostic>,
    cancelled: bool,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl DiscoveryResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `descriptor` unless its tool type is already present
    ///
    /// Returns whether it was added.
    pub fn push(&mut self, descriptor: Descriptor) -> bool {
        if !self.seen.insert(descriptor.tool_type.clone()) {
            return false;
        }
        self.descriptors.push(descriptor);
        true
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Fold one module's outcome in; returns the number of duplicates dropped
    pub fn merge(&mut self, outcome: ModuleOutcome) -> usize {
        let mut dropped = 0;
        for descriptor in outcome.descriptors {
            if !self.push(descriptor) {
                dropped += 1;
            }
        }
        self.diagnostics.extend(outcome.diagnostics);
        dropped
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Whether the pass stopped early; the result is then partial
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Descriptor> {
        self.descriptors.iter()
    }

    pub fn contains(&self, tool_type: &str) -> bool {
        self.seen.contains(tool_type)
    }

    pub fn get(&self, tool_type: &str) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.tool_type == tool_type)
    }

    /// Descriptors contributed by `module`
    pub fn from_module<'a>(
        &'a self,
        module: &'a ModuleId,
    ) -> impl Iterator<Item = &'a Descriptor> + 'a {
        self.descriptors.iter().filter(move |d| &d.module == module)
    }

    /// Distinct modules that contributed descriptors, in first-seen order
    pub fn modules(&self) -> Vec<&ModuleId> {
        let mut modules: Vec<&ModuleId> = Vec::new();
        for descriptor in &self.descriptors {
            if !modules.contains(&&descriptor.module) {
                modules.push(&descriptor.module);
            }
        }
        modules
    }

    /// Tool types in result order
    pub fn tool_types(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.tool_type.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a DiscoveryResult {
    type Item = &'a Descriptor;
    type IntoIter = std::slice::Iter<'a, Descriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}
