//! In-memory host registries.
//!
//! Listener callbacks always run after the registry lock is released so a
//! listener may call back into the registry.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::namespaces::{NamespaceHandler, NamespaceHandlerRegistry, NamespaceListener};
use super::services::{
    ListenerId, ServiceEvent, ServiceFactory, ServiceFilter, ServiceId, ServiceListener,
    ServiceProperties, ServiceReference, ServiceRegistry,
};
use super::HostError;
use crate::instance::Instance;

struct ServiceEntry {
    reference: ServiceReference,
    factory: Arc<dyn ServiceFactory>,
}

/// Process-local service registry.
pub struct InMemoryServiceRegistry {
    services: RwLock<BTreeMap<ServiceId, ServiceEntry>>,
    listeners: RwLock<HashMap<ListenerId, (ServiceFilter, Arc<dyn ServiceListener>)>>,
    next_service_id: AtomicU64,
    next_listener_id: AtomicU64,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(BTreeMap::new()),
            listeners: RwLock::new(HashMap::new()),
            next_service_id: AtomicU64::new(1),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Number of registered services.
    pub fn service_count(&self) -> usize {
        self.services.read().len()
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn fire(&self, event: ServiceEvent) {
        let targets: Vec<Arc<dyn ServiceListener>> = self
            .listeners
            .read()
            .values()
            .filter(|(filter, _)| match &event {
                ServiceEvent::Registered(r) => filter.matches(r),
                _ => true,
            })
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in targets {
            listener.service_changed(&event);
        }
    }
}

impl Default for InMemoryServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn register(
        &self,
        interfaces: Vec<String>,
        factory: Arc<dyn ServiceFactory>,
        properties: ServiceProperties,
        ranking: i32,
    ) -> ServiceId {
        let id = ServiceId(self.next_service_id.fetch_add(1, Ordering::SeqCst));
        let reference = ServiceReference {
            id,
            interfaces,
            properties,
            ranking,
        };
        debug!(service_id = id.0, interfaces = ?reference.interfaces, "[Host] Service registered");
        self.services.write().insert(
            id,
            ServiceEntry {
                reference: reference.clone(),
                factory,
            },
        );
        self.fire(ServiceEvent::Registered(reference));
        id
    }

    fn unregister(&self, id: ServiceId) -> Result<(), HostError> {
        let reference = self
            .services
            .read()
            .get(&id)
            .map(|e| e.reference.clone())
            .ok_or(HostError::UnknownService(id.0))?;
        // Consumers still see the service while Unregistering is delivered.
        self.fire(ServiceEvent::Unregistering(reference));
        self.services.write().remove(&id);
        debug!(service_id = id.0, "[Host] Service unregistered");
        Ok(())
    }

    fn set_properties(&self, id: ServiceId, properties: ServiceProperties) -> Result<(), HostError> {
        let reference = {
            let mut services = self.services.write();
            let entry = services.get_mut(&id).ok_or(HostError::UnknownService(id.0))?;
            entry.reference.properties = properties;
            entry.reference.clone()
        };
        self.fire(ServiceEvent::Modified(reference));
        Ok(())
    }

    fn references(&self, filter: &ServiceFilter) -> Vec<ServiceReference> {
        let mut matching: Vec<ServiceReference> = self
            .services
            .read()
            .values()
            .filter(|e| filter.matches(&e.reference))
            .map(|e| e.reference.clone())
            .collect();
        matching.sort_by_key(|r| (std::cmp::Reverse(r.ranking), r.id));
        matching
    }

    fn get_service(&self, id: ServiceId) -> Result<Instance, HostError> {
        let factory = self
            .services
            .read()
            .get(&id)
            .map(|e| Arc::clone(&e.factory))
            .ok_or(HostError::UnknownService(id.0))?;
        factory.get_service().map_err(HostError::Factory)
    }

    fn add_listener(&self, filter: ServiceFilter, listener: Arc<dyn ServiceListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().insert(id, (filter, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.write().remove(&id);
    }
}

/// Process-local namespace handler registry.
pub struct InMemoryNamespaceRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn NamespaceHandler>>>,
    listeners: RwLock<HashMap<ListenerId, Arc<dyn NamespaceListener>>>,
    next_listener_id: AtomicU64,
}

impl InMemoryNamespaceRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            listeners: RwLock::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Install a handler, replacing any previous one for the namespace.
    pub fn register_handler(&self, handler: Arc<dyn NamespaceHandler>) {
        let namespace = handler.namespace().to_string();
        self.handlers.write().insert(namespace.clone(), handler);
        debug!(namespace = %namespace, "[Host] Namespace handler registered");
        for listener in self.snapshot_listeners() {
            listener.handler_registered(&namespace);
        }
    }

    /// Remove the handler for `namespace`. Returns whether one was present.
    pub fn unregister_handler(&self, namespace: &str) -> bool {
        if self.handlers.write().remove(namespace).is_none() {
            return false;
        }
        debug!(namespace = %namespace, "[Host] Namespace handler unregistered");
        for listener in self.snapshot_listeners() {
            listener.handler_unregistered(namespace);
        }
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn snapshot_listeners(&self) -> Vec<Arc<dyn NamespaceListener>> {
        self.listeners.read().values().cloned().collect()
    }
}

impl Default for InMemoryNamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceHandlerRegistry for InMemoryNamespaceRegistry {
    fn handler(&self, namespace: &str) -> Option<Arc<dyn NamespaceHandler>> {
        self.handlers.read().get(namespace).cloned()
    }

    fn add_listener(&self, listener: Arc<dyn NamespaceListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.write().remove(&id);
    }
}
