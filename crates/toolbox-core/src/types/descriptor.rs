//! Descriptor: the registration unit produced per qualifying type

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property key under which the group label is stored
pub const GROUP_NAME_KEY: &str = "GroupName";

/// Identity of the module a descriptor came from
///
/// Descriptors are tagged with it so everything contributed by one module can be
/// found and removed together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId {
    /// Module name as declared by the module (file stem when undeclared)
    pub name: String,
    /// Path the module was loaded from
    pub path: PathBuf,
}

impl ModuleId {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

/// Which constructor of an override packaging type produced the descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideConstructor {
    /// Constructor taking the originating type identity
    TypeIdentity,
    /// Parameterless constructor followed by `initialize`
    Parameterless,
}

/// How the packaging type of a descriptor was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PackagingSource {
    /// Generic descriptor wrapping the originating type
    Generic,
    /// The originating type is itself a packaging type
    Intrinsic,
    /// An explicit override packaging type
    Override { constructor: OverrideConstructor },
}

/// Canonical registration unit for one discovered tool type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Originating type identity (full name); the dedup key
    pub tool_type: String,
    /// Packaging type actually used; the originating type unless overridden
    pub packaging_type: String,
    /// Label shown by the host
    pub display_name: String,
    /// Module the originating type was declared in
    pub module: ModuleId,
    /// Group (tab) the item is installed under; never empty
    pub group: String,
    pub source: PackagingSource,
    /// Free-form properties; keys are unique
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl Descriptor {
    /// Group label handed to the registry
    ///
    /// Reads the `GroupName` property so hosts that adjust properties after
    /// discovery see their change; falls back to `group`.
    pub fn group_label(&self) -> &str {
        self.properties
            .get(GROUP_NAME_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.group)
    }

    /// Get a property by key
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Whether the packaging type differs from the originating type
    pub fn is_overridden(&self) -> bool {
        matches!(self.source, PackagingSource::Override { .. })
    }
}
