//! Recipe builder: component metadata → recipes.

use std::sync::Arc;

use bp_01_definition_registry::ComponentDefinitionRegistry;
use bp_02_dependency_tracker::ServiceReferenceTracker;
use shared_types::host::ServiceRegistry;
use shared_types::{ComponentMetadata, Metadata};

use super::service_handle::ServiceRegistrationHandle;
use crate::domain::errors::RecipeError;
use crate::domain::recipe::{BeanRecipe, Recipe, RecipeKind, ValueRecipe};

/// Prefix of names generated for inline components.
pub const INLINE_PREFIX: &str = "#recipe-";

/// The output of one build: every recipe, inline ones included, plus the
/// top-level names in registration order.
#[derive(Debug, Default)]
pub struct RecipeSet {
    pub recipes: Vec<Recipe>,
    pub top_level: Vec<String>,
}

impl RecipeSet {
    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.name == name)
    }
}

pub struct RecipeBuilder {
    services: Arc<dyn ServiceRegistry>,
    inline_count: usize,
    recipes: Vec<Recipe>,
}

impl RecipeBuilder {
    pub fn new(services: Arc<dyn ServiceRegistry>) -> Self {
        Self {
            services,
            inline_count: 0,
            recipes: Vec::new(),
        }
    }

    pub fn build(mut self, definitions: &ComponentDefinitionRegistry) -> Result<RecipeSet, RecipeError> {
        for component in definitions.components() {
            let recipe = self.component_recipe(component.id().to_string(), component, definitions)?;
            self.recipes.push(recipe);
        }
        Ok(RecipeSet {
            recipes: self.recipes,
            top_level: definitions.names().to_vec(),
        })
    }

    fn component_recipe(
        &mut self,
        name: String,
        component: &ComponentMetadata,
        definitions: &ComponentDefinitionRegistry,
    ) -> Result<Recipe, RecipeError> {
        for dependency in component.depends_on() {
            check_target(&name, dependency, definitions)?;
        }

        let kind = match component {
            ComponentMetadata::Bean(bean) => {
                let arguments = bean
                    .arguments
                    .iter()
                    .map(|m| self.value_recipe(&name, m, definitions))
                    .collect::<Result<Vec<_>, _>>()?;
                let properties = bean
                    .properties
                    .iter()
                    .map(|p| Ok((p.name.clone(), self.value_recipe(&name, &p.value, definitions)?)))
                    .collect::<Result<Vec<_>, RecipeError>>()?;
                RecipeKind::Bean(BeanRecipe {
                    class_name: bean.class_name.clone(),
                    arguments,
                    properties,
                    init_method: bean.init_method.clone(),
                    destroy_method: bean.destroy_method.clone(),
                    scope: bean.scope,
                })
            }
            ComponentMetadata::Reference(reference) => RecipeKind::Reference(
                ServiceReferenceTracker::for_reference(name.clone(), reference, Arc::clone(&self.services)),
            ),
            ComponentMetadata::ReferenceList(reference) => RecipeKind::ReferenceList(
                ServiceReferenceTracker::for_reference(name.clone(), reference, Arc::clone(&self.services)),
            ),
            ComponentMetadata::Service(service) => {
                if service.interfaces.is_empty() {
                    return Err(RecipeError::Definition(format!(
                        "service '{name}' does not name any interface"
                    )));
                }
                if matches!(service.service_component, Metadata::Null) {
                    return Err(RecipeError::Definition(format!(
                        "service '{name}' has no service component"
                    )));
                }
                let service_component = self.value_recipe(&name, &service.service_component, definitions)?;
                RecipeKind::Service(ServiceRegistrationHandle::new(
                    name.clone(),
                    service_component,
                    service.interfaces.clone(),
                    service.service_properties.clone(),
                    service.ranking,
                    Arc::clone(&self.services),
                ))
            }
        };

        Ok(Recipe {
            name,
            kind,
            depends_on: component.depends_on().to_vec(),
        })
    }

    fn value_recipe(
        &mut self,
        owner: &str,
        metadata: &Metadata,
        definitions: &ComponentDefinitionRegistry,
    ) -> Result<ValueRecipe, RecipeError> {
        Ok(match metadata {
            Metadata::Null => ValueRecipe::Null,
            Metadata::Value { value, type_name } => ValueRecipe::Value {
                value: value.clone(),
                type_name: type_name.clone(),
            },
            Metadata::Ref { component_id } => {
                check_target(owner, component_id, definitions)?;
                ValueRecipe::Ref(component_id.clone())
            }
            Metadata::IdRef { component_id } => {
                check_target(owner, component_id, definitions)?;
                ValueRecipe::IdRef(component_id.clone())
            }
            Metadata::List { values } => ValueRecipe::List(
                values
                    .iter()
                    .map(|v| self.value_recipe(owner, v, definitions))
                    .collect::<Result<_, _>>()?,
            ),
            Metadata::Map { entries } => ValueRecipe::Map(
                entries
                    .iter()
                    .map(|e| {
                        Ok((
                            self.value_recipe(owner, &e.key, definitions)?,
                            self.value_recipe(owner, &e.value, definitions)?,
                        ))
                    })
                    .collect::<Result<_, RecipeError>>()?,
            ),
            Metadata::Component { component } => {
                let name = format!("{INLINE_PREFIX}{}", self.inline_count);
                self.inline_count += 1;
                let recipe = self.component_recipe(name.clone(), component, definitions)?;
                self.recipes.push(recipe);
                ValueRecipe::Inline(name)
            }
        })
    }
}

fn check_target(owner: &str, target: &str, definitions: &ComponentDefinitionRegistry) -> Result<(), RecipeError> {
    if definitions.contains(target) {
        Ok(())
    } else {
        Err(RecipeError::Definition(format!(
            "component '{owner}' refers to unknown component '{target}'"
        )))
    }
}
