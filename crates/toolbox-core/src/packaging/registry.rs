//! Packaging registry: constructor tables keyed by packaging type name

use std::collections::HashMap;

use crate::resolver::ResolveResult;
use crate::types::{ConstructorSig, OverrideConstructor, TypeInfo};

use super::item::PackagedItem;

/// Constructor taking the originating type identity
pub type TypedConstructor = Box<dyn Fn(&TypeInfo) -> ResolveResult<PackagedItem> + Send + Sync>;

/// Parameterless constructor; the result is bound afterwards with `initialize`
pub type DefaultConstructor = Box<dyn Fn() -> ResolveResult<PackagedItem> + Send + Sync>;

/// Definition of a packaging type
pub struct PackagingDefinition {
    /// Packaging type name, as referenced by override attributes
    pub name: String,
    /// Human-readable description
    pub description: String,
    pub with_type: Option<TypedConstructor>,
    pub parameterless: Option<DefaultConstructor>,
}

impl std::fmt::Debug for PackagingDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackagingDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("with_type", &self.with_type.is_some())
            .field("parameterless", &self.parameterless.is_some())
            .finish()
    }
}

impl PackagingDefinition {
    /// Create a definition with no constructors
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            with_type: None,
            parameterless: None,
        }
    }

    pub fn with_type_constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&TypeInfo) -> ResolveResult<PackagedItem> + Send + Sync + 'static,
    {
        self.with_type = Some(Box::new(constructor));
        self
    }

    pub fn with_parameterless_constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> ResolveResult<PackagedItem> + Send + Sync + 'static,
    {
        self.parameterless = Some(Box::new(constructor));
        self
    }

    /// Definition for a packaging type declared in a module
    ///
    /// Declared packaging types carry no behaviour of their own; their
    /// constructors produce plain items of the declared type.
    pub fn declared(packaging: &TypeInfo) -> Self {
        let mut definition = Self::new(packaging.full_name.clone(), "declared in module");
        if packaging.has_constructor(&ConstructorSig::TypeIdentity) {
            let name = packaging.full_name.clone();
            definition = definition.with_type_constructor(move |tool: &TypeInfo| {
                Ok(PackagedItem::for_type(name.clone(), tool))
            });
        }
        if packaging.has_constructor(&ConstructorSig::Parameterless) {
            let name = packaging.full_name.clone();
            definition = definition
                .with_parameterless_constructor(move || Ok(PackagedItem::new(name.clone())));
        }
        definition
    }

    pub fn has_constructor(&self) -> bool {
        self.with_type.is_some() || self.parameterless.is_some()
    }

    /// Build an item for `tool`
    ///
    /// The type-identity constructor wins when both exist. Returns `None` when the
    /// packaging type exposes neither constructor.
    pub fn construct(
        &self,
        tool: &TypeInfo,
    ) -> ResolveResult<Option<(PackagedItem, OverrideConstructor)>> {
        if let Some(constructor) = &self.with_type {
            let item = constructor(tool)?;
            return Ok(Some((item, OverrideConstructor::TypeIdentity)));
        }
        if let Some(constructor) = &self.parameterless {
            let mut item = constructor()?;
            item.initialize(tool);
            return Ok(Some((item, OverrideConstructor::Parameterless)));
        }
        Ok(None)
    }
}

/// Table of packaging types the host can construct
///
/// Owned by whoever builds the engine; nothing is registered process-wide.
#[derive(Debug, Default)]
pub struct PackagingRegistry {
    definitions: HashMap<String, PackagingDefinition>,
}

impl PackagingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a packaging type, replacing any definition with the same name
    pub fn register(&mut self, definition: PackagingDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    /// Builder form of `register`
    pub fn with(mut self, definition: PackagingDefinition) -> Self {
        self.register(definition);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PackagingDefinition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.definitions.remove(name).is_some()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
