//! Error types for the recipe graph

use shared_types::ContainerError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecipeError {
    /// Inconsistent metadata discovered while building recipes.
    #[error("{0}")]
    Definition(String),

    #[error("No factory registered for class '{0}'")]
    UnknownFactory(String),

    #[error("No component with id '{0}'")]
    NoSuchComponent(String),

    #[error("Unable to instantiate component '{component}': {reason}")]
    Instantiation { component: String, reason: String },

    /// Prototype beans cannot take part in a reference cycle.
    #[error("Circular reference through prototype '{0}'")]
    CircularPrototype(String),

    /// A forward reference escaped the cycle that produced it.
    #[error("Component '{0}' is still being created")]
    UnresolvedForward(String),

    #[error("Cannot convert '{value}' to {type_name}: {reason}")]
    Conversion {
        value: String,
        type_name: String,
        reason: String,
    },

    #[error("Repository has been destroyed")]
    Destroyed,
}

impl RecipeError {
    pub fn instantiation(component: impl Into<String>, reason: impl ToString) -> Self {
        Self::Instantiation {
            component: component.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<RecipeError> for ContainerError {
    fn from(err: RecipeError) -> Self {
        match err {
            RecipeError::NoSuchComponent(name) => ContainerError::NoSuchComponent(name),
            RecipeError::Instantiation { component, reason } => {
                ContainerError::Instantiation { component, reason }
            }
            RecipeError::UnresolvedForward(name) => ContainerError::Instantiation {
                reason: format!("component '{name}' is still being created"),
                component: name,
            },
            RecipeError::Destroyed => ContainerError::Destroyed,
            other => ContainerError::Definition(other.to_string()),
        }
    }
}
