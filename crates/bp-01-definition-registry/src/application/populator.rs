//! Registry population from a parsed description.

use shared_types::host::NamespaceHandlerRegistry;
use shared_types::{BlueprintDescription, Metadata};
use tracing::debug;

use crate::domain::errors::RegistryError;
use crate::domain::registry::ComponentDefinitionRegistry;

/// Prefix of ids generated for anonymous converter components.
const CONVERTER_ID_PREFIX: &str = "#type-converter-";

/// Namespaces referenced by `description` that have no registered handler.
pub fn missing_namespaces(
    description: &BlueprintDescription,
    handlers: &dyn NamespaceHandlerRegistry,
) -> Vec<String> {
    description
        .namespaces()
        .into_iter()
        .filter(|ns| handlers.handler(ns).is_none())
        .collect()
}

/// Build a fresh registry from `description`.
///
/// Custom elements are expanded by their namespace handler. Inline converter
/// components receive generated ids and are registered like any other
/// component.
pub fn populate(
    description: &BlueprintDescription,
    handlers: &dyn NamespaceHandlerRegistry,
) -> Result<ComponentDefinitionRegistry, RegistryError> {
    let mut registry = ComponentDefinitionRegistry::new();

    for component in &description.components {
        registry.register(component.clone())?;
    }

    for element in &description.custom_elements {
        let handler = handlers
            .handler(&element.namespace)
            .ok_or_else(|| RegistryError::MissingHandler(element.namespace.clone()))?;
        let components = handler
            .parse(element)
            .map_err(|reason| RegistryError::HandlerFailed {
                namespace: element.namespace.clone(),
                reason,
            })?;
        for component in components {
            registry.register(component)?;
        }
    }

    for (index, target) in description.type_converters.iter().enumerate() {
        let id = match target {
            Metadata::Ref { component_id } => component_id.clone(),
            Metadata::Component { component } => {
                let mut component = component.as_ref().clone();
                if component.id().is_empty() {
                    component.set_id(format!("{CONVERTER_ID_PREFIX}{index}"));
                }
                let id = component.id().to_string();
                registry.register(component)?;
                id
            }
            other => return Err(RegistryError::InvalidTypeConverter(format!("{:?}", other.kind()))),
        };
        registry.register_type_converter(id)?;
    }

    debug!(
        components = registry.len(),
        converters = registry.type_converters().len(),
        "[Registry] Populated"
    );
    Ok(registry)
}
