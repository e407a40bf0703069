//! The component definition registry.

use std::collections::HashMap;

use shared_types::ComponentMetadata;

use super::errors::RegistryError;

/// Named component definitions of one container generation.
///
/// Iteration follows registration order so eager creation and destruction
/// are deterministic.
#[derive(Debug, Clone, Default)]
pub struct ComponentDefinitionRegistry {
    components: HashMap<String, ComponentMetadata>,
    order: Vec<String>,
    type_converters: Vec<String>,
}

impl ComponentDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition. Ids must be non-empty and unique.
    pub fn register(&mut self, component: ComponentMetadata) -> Result<(), RegistryError> {
        let id = component.id().to_string();
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if self.components.contains_key(&id) {
            return Err(RegistryError::DuplicateComponent(id));
        }
        self.order.push(id.clone());
        self.components.insert(id, component);
        Ok(())
    }

    /// Add or overwrite a definition, keeping its original position.
    pub fn replace(&mut self, component: ComponentMetadata) -> Result<(), RegistryError> {
        let id = component.id().to_string();
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if !self.components.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.components.insert(id, component);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<ComponentMetadata> {
        let removed = self.components.remove(id)?;
        self.order.retain(|n| n != id);
        self.type_converters.retain(|n| n != id);
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&ComponentMetadata> {
        self.components.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    /// Component ids in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Definitions in registration order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentMetadata> {
        self.order.iter().filter_map(|id| self.components.get(id))
    }

    /// Mark an already registered component as a type converter.
    pub fn register_type_converter(&mut self, id: impl Into<String>) -> Result<(), RegistryError> {
        let id = id.into();
        if !self.components.contains_key(&id) {
            return Err(RegistryError::UnknownComponent(id));
        }
        if !self.type_converters.contains(&id) {
            self.type_converters.push(id);
        }
        Ok(())
    }

    /// Converter component ids in registration order.
    pub fn type_converters(&self) -> &[String] {
        &self.type_converters
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
