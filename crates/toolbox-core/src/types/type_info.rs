//! Reflective type metadata read from a module
//!
//! A `TypeInfo` is the inspectable description of one type declared in a module:
//! its name, visibility, the capabilities it implements, the constructor shapes it
//! exposes and the custom attributes attached to it. Nothing here can be invoked;
//! construction goes through the packaging registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Visibility of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Top-level public type
    #[default]
    Public,
    /// Public type nested inside another public type
    NestedPublic,
    /// Internal, private or otherwise hidden type
    NonPublic,
}

impl Visibility {
    /// Whether a consumer outside the module can see the type
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public | Visibility::NestedPublic)
    }
}

/// Constructor shapes the discovery pipeline distinguishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructorSig {
    /// No parameters
    Parameterless,
    /// A single parameter accepting the host container
    Container,
    /// A single parameter accepting a type identity
    TypeIdentity,
    /// Any other parameter list, by parameter type name
    Other(Vec<String>),
}

/// One custom attribute attached to a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeData {
    /// Attribute type name
    #[serde(rename = "type")]
    pub attribute_type: String,
    /// Positional constructor arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

impl AttributeData {
    /// Create an attribute with the given positional arguments
    pub fn new(attribute_type: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            attribute_type: attribute_type.into(),
            args,
        }
    }

    /// First positional constructor argument, if any
    pub fn first_arg(&self) -> Option<&Value> {
        self.args.first()
    }
}

/// Reflective description of one declared type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Fully qualified type name; the type's identity
    pub full_name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Capability (interface) names the type implements
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub constructors: Vec<ConstructorSig>,
    /// Generic parameters left open on the type definition
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeData>,
}

impl TypeInfo {
    /// Create a public, concrete type with no capabilities or constructors
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            visibility: Visibility::Public,
            is_abstract: false,
            implements: Vec::new(),
            constructors: Vec::new(),
            generic_parameters: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Set the visibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark the type abstract
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Add an implemented capability
    pub fn implementing(mut self, capability: impl Into<String>) -> Self {
        self.implements.push(capability.into());
        self
    }

    /// Add a constructor shape
    pub fn with_constructor(mut self, constructor: ConstructorSig) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Add an open generic parameter
    pub fn with_generic_parameter(mut self, name: impl Into<String>) -> Self {
        self.generic_parameters.push(name.into());
        self
    }

    /// Attach a custom attribute
    pub fn with_attribute(mut self, attribute_type: impl Into<String>, args: Vec<Value>) -> Self {
        self.attributes.push(AttributeData::new(attribute_type, args));
        self
    }

    /// Short name: the last segment of the full name, nested types included
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit(['.', '+'])
            .next()
            .unwrap_or(&self.full_name)
    }

    /// Whether the type implements the given capability
    pub fn implements(&self, capability: &str) -> bool {
        self.implements.iter().any(|c| c == capability)
    }

    /// Whether the type exposes the given constructor shape
    pub fn has_constructor(&self, constructor: &ConstructorSig) -> bool {
        self.constructors.contains(constructor)
    }

    pub fn contains_generic_parameters(&self) -> bool {
        !self.generic_parameters.is_empty()
    }

    /// First attribute of the given type, if declared
    pub fn attribute(&self, attribute_type: &str) -> Option<&AttributeData> {
        self.attributes
            .iter()
            .find(|a| a.attribute_type == attribute_type)
    }
}
