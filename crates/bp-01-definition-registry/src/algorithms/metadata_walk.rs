//! Recursive metadata query
//!
//! Walks every registered definition depth-first (arguments, properties,
//! collection elements, map keys and values, service components, inline
//! components) and collects the nodes of one kind.

use shared_types::{ComponentMetadata, Metadata, MetadataKind};

use crate::domain::registry::ComponentDefinitionRegistry;

/// A node returned by [`metadata_of_kind`].
#[derive(Debug, Clone, Copy)]
pub enum MetadataNode<'a> {
    /// A top-level or inline component.
    Component(&'a ComponentMetadata),
    /// A plain value node.
    Value(&'a Metadata),
}

impl<'a> MetadataNode<'a> {
    pub fn kind(&self) -> MetadataKind {
        match self {
            Self::Component(c) => c.kind(),
            Self::Value(m) => m.kind(),
        }
    }

    pub fn as_component(&self) -> Option<&'a ComponentMetadata> {
        match self {
            Self::Component(c) => Some(c),
            Self::Value(_) => None,
        }
    }
}

/// All metadata of `kind` reachable from the registry, in registration then
/// declaration order.
pub fn metadata_of_kind(
    registry: &ComponentDefinitionRegistry,
    kind: MetadataKind,
) -> Vec<MetadataNode<'_>> {
    let mut found = Vec::new();
    for component in registry.components() {
        visit_component(component, kind, &mut found);
    }
    found
}

fn visit_component<'a>(
    component: &'a ComponentMetadata,
    kind: MetadataKind,
    found: &mut Vec<MetadataNode<'a>>,
) {
    if component.kind() == kind {
        found.push(MetadataNode::Component(component));
    }
    for child in component.children() {
        visit_value(child, kind, found);
    }
}

fn visit_value<'a>(value: &'a Metadata, kind: MetadataKind, found: &mut Vec<MetadataNode<'a>>) {
    if let Metadata::Component { component } = value {
        visit_component(component, kind, found);
        return;
    }
    if value.kind() == kind {
        found.push(MetadataNode::Value(value));
    }
    for child in value.children() {
        visit_value(child, kind, found);
    }
}
