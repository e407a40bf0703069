//! Recipes: pure construction plans. Results are cached by the repository,
//! never by the recipe.

use std::sync::Arc;

use bp_02_dependency_tracker::ServiceReferenceTracker;
use shared_types::Scope;

use crate::application::service_handle::ServiceRegistrationHandle;

/// Plan for one injected value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRecipe {
    Null,
    Value {
        value: String,
        type_name: Option<String>,
    },
    /// A top-level component, resolved through its own slot.
    Ref(String),
    /// An inline component, registered under a generated name. Part of the
    /// enclosing component's own dependency tree.
    Inline(String),
    IdRef(String),
    List(Vec<ValueRecipe>),
    Map(Vec<(ValueRecipe, ValueRecipe)>),
}

impl ValueRecipe {
    /// Names this recipe resolves through the repository, in order.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Ref(name) | Self::Inline(name) => names.push(name),
            Self::List(items) => items.iter().for_each(|i| i.collect_names(names)),
            Self::Map(entries) => entries.iter().for_each(|(k, v)| {
                k.collect_names(names);
                v.collect_names(names);
            }),
            Self::Null | Self::Value { .. } | Self::IdRef(_) => {}
        }
    }
}

/// Plan for a locally constructed bean.
#[derive(Debug, Clone, PartialEq)]
pub struct BeanRecipe {
    pub class_name: String,
    pub arguments: Vec<ValueRecipe>,
    pub properties: Vec<(String, ValueRecipe)>,
    pub init_method: Option<String>,
    pub destroy_method: Option<String>,
    pub scope: Scope,
}

#[derive(Debug, Clone)]
pub enum RecipeKind {
    Bean(BeanRecipe),
    /// Materialises as a `ReferenceProxy`.
    Reference(Arc<ServiceReferenceTracker>),
    /// Materialises as a `ReferenceListProxy`.
    ReferenceList(Arc<ServiceReferenceTracker>),
    /// Materialises as the registration handle itself.
    Service(Arc<ServiceRegistrationHandle>),
}

/// Plan for one named component.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub kind: RecipeKind,
    /// Components created before this one.
    pub depends_on: Vec<String>,
}

impl Recipe {
    pub fn is_prototype(&self) -> bool {
        matches!(&self.kind, RecipeKind::Bean(b) if b.scope == Scope::Prototype)
    }

    /// The tracker when this recipe is a satisfiable dependency itself.
    pub fn tracker(&self) -> Option<&Arc<ServiceReferenceTracker>> {
        match &self.kind {
            RecipeKind::Reference(t) | RecipeKind::ReferenceList(t) => Some(t),
            _ => None,
        }
    }

    pub fn service_handle(&self) -> Option<&Arc<ServiceRegistrationHandle>> {
        match &self.kind {
            RecipeKind::Service(h) => Some(h),
            _ => None,
        }
    }

    /// Value recipes nested directly in this component.
    pub fn nested_values(&self) -> Vec<&ValueRecipe> {
        match &self.kind {
            RecipeKind::Bean(b) => b
                .arguments
                .iter()
                .chain(b.properties.iter().map(|(_, v)| v))
                .collect(),
            RecipeKind::Service(h) => vec![h.service_component()],
            RecipeKind::Reference(_) | RecipeKind::ReferenceList(_) => Vec::new(),
        }
    }
}
