//! Loader for modules carrying a JSON metadata table
//!
//! Layout of a module file:
//!
//! ```json
//! {
//!   "format": 1,
//!   "name": "Acme.Controls",
//!   "version": "13.1.0",
//!   "dependencies": ["Acme.Data"],
//!   "types": [
//!     {
//!       "full_name": "Acme.Controls.Grid",
//!       "implements": ["component"],
//!       "constructors": ["parameterless"],
//!       "attributes": [{"type": "ToolboxTabName", "args": ["Data"]}]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::traits::{LoadResult, ModuleHandle, ModuleLoadError, ModuleLoader};
use crate::types::{ModuleId, TypeInfo};

/// Metadata format version this loader reads
pub const SUPPORTED_FORMAT: u32 = 1;

#[derive(Deserialize)]
struct FormatHeader {
    format: Option<u32>,
}

#[derive(Deserialize)]
struct ModuleManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    types: Vec<TypeInfo>,
}

/// Reads modules whose type metadata is a JSON document
///
/// Dependencies are resolved next to the module: a dependency `Acme.Data` of
/// `/lib/Acme.Controls.tmod` must exist as `/lib/Acme.Data.tmod`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestModuleLoader;

impl ManifestModuleLoader {
    pub fn new() -> Self {
        Self
    }

    /// Paths of the listed dependencies, each of which must exist
    fn resolve_dependencies(path: &Path, dependencies: &[String]) -> LoadResult<Vec<PathBuf>> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let mut resolved = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            let file_name = if extension.is_empty() {
                dependency.clone()
            } else {
                format!("{}.{}", dependency, extension)
            };
            let dependency_path = path.with_file_name(file_name);
            if !dependency_path.is_file() {
                return Err(ModuleLoadError::MissingDependency {
                    path: path.to_path_buf(),
                    dependency: dependency.clone(),
                });
            }
            resolved.push(dependency_path);
        }
        Ok(resolved)
    }

    fn check_types(path: &Path, types: &[TypeInfo]) -> LoadResult<()> {
        let mut seen = HashSet::new();
        for ty in types {
            if ty.full_name.trim().is_empty() {
                return Err(ModuleLoadError::corrupt(path, "type with empty name"));
            }
            if !seen.insert(ty.full_name.as_str()) {
                return Err(ModuleLoadError::corrupt(
                    path,
                    format!("type {} declared twice", ty.full_name),
                ));
            }
        }
        Ok(())
    }
}

impl ModuleLoader for ManifestModuleLoader {
    fn name(&self) -> &str {
        "manifest"
    }

    fn load(&self, path: &Path) -> LoadResult<ModuleHandle> {
        let bytes = fs::read(path).map_err(|source| ModuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let header: FormatHeader = serde_json::from_slice(&bytes)
            .map_err(|e| ModuleLoadError::corrupt(path, e.to_string()))?;
        match header.format {
            None => return Err(ModuleLoadError::corrupt(path, "missing format version")),
            Some(SUPPORTED_FORMAT) => {}
            Some(found) => {
                return Err(ModuleLoadError::Incompatible {
                    path: path.to_path_buf(),
                    found,
                    supported: SUPPORTED_FORMAT,
                })
            }
        }

        let manifest: ModuleManifest = serde_json::from_slice(&bytes)
            .map_err(|e| ModuleLoadError::corrupt(path, e.to_string()))?;
        Self::check_types(path, &manifest.types)?;
        let dependencies = Self::resolve_dependencies(path, &manifest.dependencies)?;

        let name = manifest
            .name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default();

        let handle = ModuleHandle::new(ModuleId::new(name, path), manifest.types)
            .with_dependencies(dependencies);
        Ok(match manifest.version {
            Some(version) => handle.with_version(version),
            None => handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write(path: &Path, value: serde_json::Value) {
        fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
    }

    #[test]
    fn test_load_module() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Acme.Controls.tmod");
        write(
            &path,
            json!({
                "format": 1,
                "name": "Acme.Controls",
                "version": "13.1.0",
                "types": [
                    {
                        "full_name": "Acme.Controls.Grid",
                        "implements": ["component"],
                        "constructors": ["parameterless"]
                    },
                    {"full_name": "Acme.Controls.Helper"}
                ]
            }),
        );

        let module = ManifestModuleLoader::new().load(&path).unwrap();
        assert_eq!(module.id().name, "Acme.Controls");
        assert_eq!(module.id().path(), path.as_path());
        assert_eq!(module.version(), Some("13.1.0"));
        assert_eq!(module.types().len(), 2);
        assert!(module.find_type("Acme.Controls.Helper").is_some());
        assert!(module.find_type("Acme.Controls.Missing").is_none());
    }

    #[test]
    fn test_name_defaults_to_file_stem() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Loose.tmod");
        write(&path, json!({"format": 1, "types": []}));

        let module = ManifestModuleLoader::new().load(&path).unwrap();
        assert_eq!(module.id().name, "Loose");
        assert!(module.version().is_none());
    }

    #[test]
    fn test_corrupt_module() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.tmod");
        fs::write(&path, b"\x7fELF not json").unwrap();

        let err = ManifestModuleLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, ModuleLoadError::Corrupt { .. }));
        assert_eq!(err.path(), path.as_path());

        write(&path, json!({"types": []}));
        let err = ManifestModuleLoader::new().load(&path).unwrap_err();
        assert!(err.to_string().contains("missing format version"));

        write(
            &path,
            json!({"format": 1, "types": [{"full_name": "A"}, {"full_name": "A"}]}),
        );
        let err = ManifestModuleLoader::new().load(&path).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_incompatible_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.tmod");
        write(&path, json!({"format": 7, "layout": "something else"}));

        let err = ManifestModuleLoader::new().load(&path).unwrap_err();
        assert!(matches!(
            err,
            ModuleLoadError::Incompatible { found: 7, supported: 1, .. }
        ));
    }

    #[test]
    fn test_dependencies_resolved_next_to_module() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Acme.Controls.tmod");
        write(
            &path,
            json!({"format": 1, "dependencies": ["Acme.Data"], "types": []}),
        );

        let err = ManifestModuleLoader::new().load(&path).unwrap_err();
        assert!(matches!(
            err,
            ModuleLoadError::MissingDependency { ref dependency, .. } if dependency == "Acme.Data"
        ));

        write(&dir.path().join("Acme.Data.tmod"), json!({"format": 1}));
        let module = ManifestModuleLoader::new().load(&path).unwrap();
        assert_eq!(module.dependencies(), &[dir.path().join("Acme.Data.tmod")]);
    }

    #[test]
    fn test_unreadable_module() {
        let dir = tempdir().unwrap();
        let err = ManifestModuleLoader::new()
            .load(&dir.path().join("gone.tmod"))
            .unwrap_err();
        assert!(matches!(err, ModuleLoadError::Io { .. }));
    }
}
