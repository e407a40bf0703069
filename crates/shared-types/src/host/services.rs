//! Service registry port.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::HostError;
use crate::instance::Instance;

/// Property key carrying the registered interface names.
pub const OBJECT_CLASS: &str = "objectClass";

pub type ServiceProperties = BTreeMap<String, String>;

/// Registry-assigned service identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId(pub u64);

/// Handle returned by `add_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Match predicate over registered services: an interface name plus exact
/// property equalities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ServiceFilter {
    pub interface: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl ServiceFilter {
    pub fn for_interface(interface: impl Into<String>) -> Self {
        Self {
            interface: Some(interface.into()),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, reference: &ServiceReference) -> bool {
        if let Some(interface) = &self.interface {
            if !reference.interfaces.iter().any(|i| i == interface) {
                return false;
            }
        }
        self.properties
            .iter()
            .all(|(k, v)| reference.properties.get(k) == Some(v))
    }
}

impl fmt::Display for ServiceFilter {
    /// LDAP-style rendering, used in grace period and failure notifications.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut clauses = Vec::new();
        if let Some(interface) = &self.interface {
            clauses.push(format!("({OBJECT_CLASS}={interface})"));
        }
        for (k, v) in &self.properties {
            clauses.push(format!("({k}={v})"));
        }
        match clauses.len() {
            0 => f.write_str("(*)"),
            1 => f.write_str(&clauses[0]),
            _ => write!(f, "(&{})", clauses.concat()),
        }
    }
}

/// A registered service as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReference {
    pub id: ServiceId,
    pub interfaces: Vec<String>,
    pub properties: ServiceProperties,
    pub ranking: i32,
}

impl ServiceReference {
    /// Ordering key: highest ranking first, then lowest id.
    pub fn precedes(&self, other: &ServiceReference) -> bool {
        (std::cmp::Reverse(self.ranking), self.id) < (std::cmp::Reverse(other.ranking), other.id)
    }
}

/// Produces the service object on lookup.
pub trait ServiceFactory: Send + Sync {
    fn get_service(&self) -> Result<Instance, String>;
}

/// Factory returning a fixed instance.
pub struct SingletonServiceFactory(pub Instance);

impl ServiceFactory for SingletonServiceFactory {
    fn get_service(&self) -> Result<Instance, String> {
        Ok(self.0.clone())
    }
}

/// Registry change notification.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    Registered(ServiceReference),
    Modified(ServiceReference),
    Unregistering(ServiceReference),
}

impl ServiceEvent {
    pub fn reference(&self) -> &ServiceReference {
        match self {
            Self::Registered(r) | Self::Modified(r) | Self::Unregistering(r) => r,
        }
    }
}

pub trait ServiceListener: Send + Sync {
    fn service_changed(&self, event: &ServiceEvent);
}

/// Registration, lookup and change notification of services.
pub trait ServiceRegistry: Send + Sync {
    fn register(
        &self,
        interfaces: Vec<String>,
        factory: Arc<dyn ServiceFactory>,
        properties: ServiceProperties,
        ranking: i32,
    ) -> ServiceId;

    fn unregister(&self, id: ServiceId) -> Result<(), HostError>;

    fn set_properties(&self, id: ServiceId, properties: ServiceProperties) -> Result<(), HostError>;

    /// Matching services, best first.
    fn references(&self, filter: &ServiceFilter) -> Vec<ServiceReference>;

    fn get_service(&self, id: ServiceId) -> Result<Instance, HostError>;

    /// Listeners receive `Registered` only for matching services; `Modified`
    /// and `Unregistering` are delivered unfiltered.
    fn add_listener(&self, filter: ServiceFilter, listener: Arc<dyn ServiceListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}
