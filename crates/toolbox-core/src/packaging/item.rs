//! Packaged item: a packaging type instance under construction

use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::TypeInfo;

/// An instance of a packaging type
///
/// Constructors taking a type identity return an item already bound to the
/// originating type; parameterless constructors return an unbound item which the
/// resolver binds with `initialize`.
#[derive(Debug, Clone, PartialEq)]
pub struct PackagedItem {
    packaging_type: String,
    tool_type: Option<String>,
    display_name: Option<String>,
    properties: BTreeMap<String, Value>,
}

impl PackagedItem {
    /// Create an unbound item of the given packaging type
    pub fn new(packaging_type: impl Into<String>) -> Self {
        Self {
            packaging_type: packaging_type.into(),
            tool_type: None,
            display_name: None,
            properties: BTreeMap::new(),
        }
    }

    /// Create an item bound to `tool`
    pub fn for_type(packaging_type: impl Into<String>, tool: &TypeInfo) -> Self {
        let mut item = Self::new(packaging_type);
        item.initialize(tool);
        item
    }

    /// Bind the item to its originating type
    ///
    /// Keeps a display name set by the constructor; otherwise uses the type's short
    /// name.
    pub fn initialize(&mut self, tool: &TypeInfo) {
        self.tool_type = Some(tool.full_name.clone());
        if self.display_name.is_none() {
            self.display_name = Some(tool.name().to_string());
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn packaging_type(&self) -> &str {
        &self.packaging_type
    }

    /// Originating type the item is bound to, if any
    pub fn tool_type(&self) -> Option<&str> {
        self.tool_type.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn is_initialized(&self) -> bool {
        self.tool_type.is_some()
    }

    pub(crate) fn into_properties(self) -> BTreeMap<String, Value> {
        self.properties
    }
}
