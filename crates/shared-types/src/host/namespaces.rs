//! Namespace handler registry port.

use std::sync::Arc;

use super::ListenerId;
use crate::metadata::{ComponentMetadata, CustomElement};

/// Interprets custom elements of one vocabulary into component metadata.
pub trait NamespaceHandler: Send + Sync {
    fn namespace(&self) -> &str;

    fn parse(&self, element: &CustomElement) -> Result<Vec<ComponentMetadata>, String>;
}

/// Notified when handlers come and go.
pub trait NamespaceListener: Send + Sync {
    fn handler_registered(&self, namespace: &str);

    fn handler_unregistered(&self, namespace: &str);
}

pub trait NamespaceHandlerRegistry: Send + Sync {
    fn handler(&self, namespace: &str) -> Option<Arc<dyn NamespaceHandler>>;

    fn add_listener(&self, listener: Arc<dyn NamespaceListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// Filter string reported while waiting for a namespace handler.
pub fn namespace_filter(namespace: &str) -> String {
    format!("(&(objectClass=NamespaceHandler)(osgi.service.blueprint.namespace={namespace}))")
}
