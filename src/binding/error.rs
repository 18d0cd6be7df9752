//! Binding errors

use crate::config::ConfigError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors raised by the mapping engine and the registry facade
#[derive(Error, Debug)]
pub enum BindingError {
    /// Malformed or missing type descriptor
    #[error("Invalid descriptor for {type_name}: {reason}")]
    Validation { type_name: String, reason: String },

    /// A value or property cannot be mapped to statements (or back)
    #[error("Cannot map {type_name}.{property}: {reason}")]
    Mapping {
        type_name: String,
        property: String,
        reason: String,
    },

    /// The property is not declared by the type
    #[error("Unknown property {property} on {type_name}")]
    UnknownProperty { type_name: String, property: String },

    /// Node absent (or deleted under a live proxy)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Failure reported by the triple store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Engine configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Binding-class metadata names no loadable type
    #[error("Cannot resolve binding class for {node}: {reason}")]
    ClassResolution { node: String, reason: String },
}

impl BindingError {
    pub(crate) fn mapping(
        type_name: impl Into<String>,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        BindingError::Mapping {
            type_name: type_name.into(),
            property: property.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        BindingError::Validation {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

pub type BindingResult<T> = Result<T, BindingError>;
