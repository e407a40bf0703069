//! # Component Metadata
//!
//! The already-parsed declarative description consumed by the container.
//!
//! Metadata is a closed set of tagged variants. Nested values (`Metadata`)
//! describe wiring; top-level definitions (`ComponentMetadata`) describe
//! components. Both are immutable once a registry generation is populated.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::errors::ContainerError;

/// A nested metadata value: the right-hand side of an argument, a property,
/// a collection element or a service component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Metadata {
    /// Explicit null.
    Null,
    /// A literal, optionally converted to `type_name`.
    Value {
        value: String,
        #[serde(default)]
        type_name: Option<String>,
    },
    /// Reference to the instance of a named component.
    Ref { component_id: String },
    /// The id of a named component, injected as text.
    IdRef { component_id: String },
    /// Ordered collection.
    List {
        #[serde(default)]
        values: Vec<Metadata>,
    },
    /// Keyed collection.
    Map {
        #[serde(default)]
        entries: Vec<MapEntry>,
    },
    /// Anonymous inline component.
    Component { component: Box<ComponentMetadata> },
}

impl Metadata {
    /// Literal value without a target type.
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value {
            value: value.into(),
            type_name: None,
        }
    }

    /// Literal value converted to `type_name` at creation.
    pub fn typed(value: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::Value {
            value: value.into(),
            type_name: Some(type_name.into()),
        }
    }

    /// Reference to another component by id.
    pub fn reference(component_id: impl Into<String>) -> Self {
        Self::Ref {
            component_id: component_id.into(),
        }
    }

    /// Inline component.
    pub fn inline(component: ComponentMetadata) -> Self {
        Self::Component {
            component: Box::new(component),
        }
    }

    /// Variant tag of this node.
    pub fn kind(&self) -> MetadataKind {
        match self {
            Self::Null => MetadataKind::Null,
            Self::Value { .. } => MetadataKind::Value,
            Self::Ref { .. } => MetadataKind::Ref,
            Self::IdRef { .. } => MetadataKind::IdRef,
            Self::List { .. } => MetadataKind::List,
            Self::Map { .. } => MetadataKind::Map,
            Self::Component { component } => component.kind(),
        }
    }

    /// Direct children, in declaration order.
    pub fn children(&self) -> Vec<&Metadata> {
        match self {
            Self::List { values } => values.iter().collect(),
            Self::Map { entries } => entries.iter().flat_map(|e| [&e.key, &e.value]).collect(),
            Self::Component { component } => component.children(),
            _ => Vec::new(),
        }
    }
}

/// One entry of a `Metadata::Map`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Metadata,
    pub value: Metadata,
}

/// Flat tag over every metadata variant, used by the recursive visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    Null,
    Value,
    Ref,
    IdRef,
    List,
    Map,
    Bean,
    Reference,
    ReferenceList,
    Service,
}

/// Creation scope of a bean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Singleton,
    Prototype,
}

/// Activation policy of a top-level component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initialization {
    #[default]
    Eager,
    Lazy,
}

/// Whether a reference gates activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Mandatory,
    Optional,
}

/// A named property injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeanProperty {
    pub name: String,
    pub value: Metadata,
}

/// A component constructed locally through a registered factory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BeanMetadata {
    #[serde(default)]
    pub id: String,
    pub class_name: String,
    #[serde(default)]
    pub arguments: Vec<Metadata>,
    #[serde(default)]
    pub properties: Vec<BeanProperty>,
    #[serde(default)]
    pub init_method: Option<String>,
    #[serde(default)]
    pub destroy_method: Option<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub initialization: Initialization,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Marks the bean as a processor to be activated in the processor phase.
    #[serde(default)]
    pub processor: bool,
}

impl BeanMetadata {
    pub fn new(id: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    pub fn with_argument(mut self, value: Metadata) -> Self {
        self.arguments.push(value);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Metadata) -> Self {
        self.properties.push(BeanProperty {
            name: name.into(),
            value,
        });
        self
    }

    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method = Some(method.into());
        self
    }

    pub fn with_destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method = Some(method.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.initialization = Initialization::Lazy;
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    pub fn as_processor(mut self) -> Self {
        self.processor = true;
        self
    }
}

/// A dependency on an externally provided service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceMetadata {
    #[serde(default)]
    pub id: String,
    pub interface: String,
    #[serde(default)]
    pub filter: BTreeMap<String, String>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub initialization: Initialization,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ReferenceMetadata {
    pub fn new(id: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            interface: interface.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.availability = Availability::Optional;
        self
    }
}

/// A component published into the host service registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    #[serde(default)]
    pub id: String,
    pub service_component: Metadata,
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub service_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub ranking: i32,
    #[serde(default)]
    pub initialization: Initialization,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ServiceMetadata {
    pub fn new(id: impl Into<String>, service_component: Metadata, interface: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service_component,
            interfaces: vec![interface.into()],
            service_properties: BTreeMap::new(),
            ranking: 0,
            initialization: Initialization::Eager,
            depends_on: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.service_properties.insert(key.into(), value.into());
        self
    }

    pub fn with_ranking(mut self, ranking: i32) -> Self {
        self.ranking = ranking;
        self
    }
}

/// A top-level component definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentMetadata {
    Bean(BeanMetadata),
    Reference(ReferenceMetadata),
    ReferenceList(ReferenceMetadata),
    Service(ServiceMetadata),
}

impl ComponentMetadata {
    pub fn id(&self) -> &str {
        match self {
            Self::Bean(b) => &b.id,
            Self::Reference(r) | Self::ReferenceList(r) => &r.id,
            Self::Service(s) => &s.id,
        }
    }

    /// Replace the id; used for generated names of inline components.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        match self {
            Self::Bean(b) => b.id = id,
            Self::Reference(r) | Self::ReferenceList(r) => r.id = id,
            Self::Service(s) => s.id = id,
        }
    }

    pub fn initialization(&self) -> Initialization {
        match self {
            Self::Bean(b) => b.initialization,
            Self::Reference(r) | Self::ReferenceList(r) => r.initialization,
            Self::Service(s) => s.initialization,
        }
    }

    pub fn depends_on(&self) -> &[String] {
        match self {
            Self::Bean(b) => &b.depends_on,
            Self::Reference(r) | Self::ReferenceList(r) => &r.depends_on,
            Self::Service(s) => &s.depends_on,
        }
    }

    pub fn kind(&self) -> MetadataKind {
        match self {
            Self::Bean(_) => MetadataKind::Bean,
            Self::Reference(_) => MetadataKind::Reference,
            Self::ReferenceList(_) => MetadataKind::ReferenceList,
            Self::Service(_) => MetadataKind::Service,
        }
    }

    /// Whether the component is materialised when the container is created.
    /// Prototype beans never are.
    pub fn is_eager(&self) -> bool {
        match self {
            Self::Bean(b) => b.scope == Scope::Singleton && b.initialization == Initialization::Eager,
            other => other.initialization() == Initialization::Eager,
        }
    }

    /// Direct nested metadata, in declaration order.
    pub fn children(&self) -> Vec<&Metadata> {
        match self {
            Self::Bean(b) => b
                .arguments
                .iter()
                .chain(b.properties.iter().map(|p| &p.value))
                .collect(),
            Self::Reference(_) | Self::ReferenceList(_) => Vec::new(),
            Self::Service(s) => vec![&s.service_component],
        }
    }
}

/// An element of a foreign vocabulary, interpreted by a namespace handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomElement {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// The parsed description of one module's components.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlueprintDescription {
    #[serde(default)]
    pub components: Vec<ComponentMetadata>,
    #[serde(default)]
    pub custom_elements: Vec<CustomElement>,
    /// Converter components, either inline or references to top-level beans.
    #[serde(default)]
    pub type_converters: Vec<Metadata>,
}

impl BlueprintDescription {
    /// Every namespace referenced by a custom element, sorted.
    pub fn namespaces(&self) -> BTreeSet<String> {
        self.custom_elements
            .iter()
            .map(|e| e.namespace.clone())
            .collect()
    }

    /// Reject empty or duplicate top-level ids.
    pub fn validate(&self) -> Result<(), ContainerError> {
        let mut seen = HashSet::new();
        for component in &self.components {
            let id = component.id();
            if id.is_empty() {
                return Err(ContainerError::definition("top-level component without an id"));
            }
            if !seen.insert(id) {
                return Err(ContainerError::definition(format!(
                    "duplicate component id '{id}'"
                )));
            }
        }
        Ok(())
    }
}
