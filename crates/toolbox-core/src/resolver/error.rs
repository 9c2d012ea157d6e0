//! Resolution error types

use thiserror::Error;

/// Errors raised while deriving a descriptor for one type
///
/// Contained by the engine: the type is skipped and the error recorded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The override names a type found neither in the registry nor the module
    #[error("packaging type {packaging_type} requested by {tool_type} was not found")]
    PackagingTypeNotFound {
        tool_type: String,
        packaging_type: String,
    },

    #[error("malformed {attribute} attribute on {tool_type}: {message}")]
    MalformedAttribute {
        tool_type: String,
        attribute: String,
        message: String,
    },

    #[error("{type_name} cannot be instantiated: {reason}")]
    NotInstantiable { type_name: String, reason: String },

    #[error("{packaging_type} constructor failed: {message}")]
    ConstructorFailed {
        packaging_type: String,
        message: String,
    },

    #[error("{packaging_type} constructor panicked while packaging {tool_type}")]
    ConstructorPanicked {
        packaging_type: String,
        tool_type: String,
    },

    /// A constructor returned an item not bound to any originating type
    #[error("{packaging_type} did not bind to {tool_type}")]
    Unbound {
        packaging_type: String,
        tool_type: String,
    },
}

impl ResolutionError {
    pub fn constructor_failed(
        packaging_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ConstructorFailed {
            packaging_type: packaging_type.into(),
            message: message.into(),
        }
    }

    pub fn not_instantiable(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotInstantiable {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolutionError>;
