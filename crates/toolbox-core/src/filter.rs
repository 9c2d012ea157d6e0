//! Capability filter
//!
//! Selects the types of a catalog that can become tools. A pure predicate: nothing
//! is instantiated here.

use crate::config::DiscoveryConfig;
use crate::types::{ConstructorSig, TypeInfo};

/// The rule a type must satisfy to be offered to the resolver
///
/// A type qualifies when it implements the capability, is not abstract, is
/// publicly visible (or non-public types are allowed), and has a parameterless
/// constructor or one accepting the host container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityPredicate {
    capability: String,
    allow_non_public: bool,
}

impl CapabilityPredicate {
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            allow_non_public: false,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            capability: config.component_capability.clone(),
            allow_non_public: config.allow_non_public,
        }
    }

    /// Also accept non-public types
    pub fn with_non_public(mut self) -> Self {
        self.allow_non_public = true;
        self
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn allows_non_public(&self) -> bool {
        self.allow_non_public
    }

    pub fn is_visible(&self, ty: &TypeInfo) -> bool {
        self.allow_non_public || ty.visibility.is_public()
    }

    /// Visible, concrete and implementing the capability; constructors not checked
    pub fn is_eligible(&self, ty: &TypeInfo) -> bool {
        self.is_visible(ty) && !ty.is_abstract && ty.implements(&self.capability)
    }

    pub fn has_usable_constructor(ty: &TypeInfo) -> bool {
        ty.has_constructor(&ConstructorSig::Parameterless)
            || ty.has_constructor(&ConstructorSig::Container)
    }

    /// Check if a type satisfies the full predicate
    pub fn matches(&self, ty: &TypeInfo) -> bool {
        self.is_eligible(ty) && Self::has_usable_constructor(ty)
    }

    /// Qualifying types, in catalog order
    pub fn select<'a>(
        &'a self,
        catalog: &'a [TypeInfo],
    ) -> impl Iterator<Item = &'a TypeInfo> + 'a {
        catalog.iter().filter(move |ty| self.matches(ty))
    }
}
