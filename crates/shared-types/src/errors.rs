//! # Error Types
//!
//! The container error taxonomy shared by all subsystems.
//!
//! Unsatisfied external dependencies are deliberately absent: they are a
//! transient condition reported through `GracePeriod` events, never an error.

use std::time::Duration;

use thiserror::Error;

/// Errors that abort a container bootstrap or a component lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Malformed or inconsistent declarative metadata.
    #[error("Definition error: {0}")]
    Definition(String),

    /// A failure raised while materialising a component.
    #[error("Unable to instantiate component '{component}': {reason}")]
    Instantiation { component: String, reason: String },

    /// Initial dependencies were not satisfied within the configured budget.
    #[error("Timed out after {waited_ms} ms waiting for dependencies {missing:?}")]
    Timeout { waited_ms: u64, missing: Vec<String> },

    /// Lookup of a component id the container does not define.
    #[error("No component with id '{0}'")]
    NoSuchComponent(String),

    /// Request made after the container was destroyed.
    #[error("Container has been destroyed")]
    Destroyed,
}

impl ContainerError {
    /// Build a definition error from anything displayable.
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition(message.into())
    }

    /// Build an instantiation error for the named component.
    pub fn instantiation(component: impl Into<String>, reason: impl ToString) -> Self {
        Self::Instantiation {
            component: component.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a timeout error for the given wait budget.
    pub fn timeout(waited: Duration, missing: Vec<String>) -> Self {
        Self::Timeout {
            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            missing,
        }
    }

    /// Whether this error was produced by the dependency timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
