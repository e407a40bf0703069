//! Error types for the definition registry

use shared_types::ContainerError;
use thiserror::Error;

/// Errors raised while populating or rewriting a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Component without an id")]
    EmptyId,

    #[error("Duplicate component definition '{0}'")]
    DuplicateComponent(String),

    #[error("Unknown component '{0}'")]
    UnknownComponent(String),

    #[error("Unexpected metadata for type converter: {0}")]
    InvalidTypeConverter(String),

    #[error("No handler registered for namespace '{0}'")]
    MissingHandler(String),

    #[error("Namespace handler for '{namespace}' failed: {reason}")]
    HandlerFailed { namespace: String, reason: String },

    #[error("Registry processor '{processor}' failed: {reason}")]
    ProcessorFailed { processor: String, reason: String },
}

impl From<RegistryError> for ContainerError {
    fn from(err: RegistryError) -> Self {
        ContainerError::Definition(err.to_string())
    }
}
