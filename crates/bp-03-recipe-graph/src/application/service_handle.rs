//! Service registration recipes.
//!
//! A published-service component materialises as its registration handle.
//! Registration installs a lazy factory: the service component itself is
//! created on first lookup, not when the service is registered.
//!
//! The handle's lock is never held while the host registry runs its
//! listeners, so a listener may register or unregister the same handle.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, warn};

use shared_types::host::{ServiceFactory, ServiceId, ServiceProperties, ServiceRegistry};
use shared_types::Instance;

use super::repository::Repository;
use crate::domain::recipe::ValueRecipe;

/// Service property carrying the publishing component's id.
pub const COMPONENT_NAME_PROPERTY: &str = "osgi.service.blueprint.compname";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registration {
    Idle,
    /// The host is registering the service and notifying its listeners.
    Pending,
    Active(ServiceId),
    /// The owning container is gone; no further registrations.
    Retired,
}

pub struct ServiceRegistrationHandle {
    name: String,
    service_component: ValueRecipe,
    interfaces: Vec<String>,
    properties: ServiceProperties,
    ranking: i32,
    registry: Arc<dyn ServiceRegistry>,
    registration: Mutex<Registration>,
}

impl ServiceRegistrationHandle {
    pub fn new(
        name: impl Into<String>,
        service_component: ValueRecipe,
        interfaces: Vec<String>,
        mut properties: ServiceProperties,
        ranking: i32,
        registry: Arc<dyn ServiceRegistry>,
    ) -> Arc<Self> {
        let name = name.into();
        properties.insert(COMPONENT_NAME_PROPERTY.to_string(), name.clone());
        Arc::new(Self {
            name,
            service_component,
            interfaces,
            properties,
            ranking,
            registry,
            registration: Mutex::new(Registration::Idle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service_component(&self) -> &ValueRecipe {
        &self.service_component
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Register with the host unless already registered. Returns whether a
    /// new registration was made.
    pub fn register(&self, repository: &Arc<Repository>) -> bool {
        {
            let mut registration = self.registration.lock();
            if *registration != Registration::Idle {
                return false;
            }
            *registration = Registration::Pending;
        }
        let factory = Arc::new(LazyServiceFactory {
            component: self.name.clone(),
            recipe: self.service_component.clone(),
            repository: Arc::downgrade(repository),
            cached: OnceLock::new(),
        });
        let id = self.registry.register(
            self.interfaces.clone(),
            factory,
            self.properties.clone(),
            self.ranking,
        );

        let withdrawn = {
            let mut registration = self.registration.lock();
            if *registration == Registration::Pending {
                *registration = Registration::Active(id);
                false
            } else {
                true
            }
        };
        if withdrawn {
            // Unregistered or retired while the host was notifying listeners.
            self.withdraw(id);
            return false;
        }
        debug!(component = %self.name, service_id = id.0, "[Repository] Service registered");
        true
    }

    /// Withdraw the registration if present. Returns whether one was removed.
    pub fn unregister(&self) -> bool {
        let id = {
            let mut registration = self.registration.lock();
            match *registration {
                Registration::Active(id) => {
                    *registration = Registration::Idle;
                    id
                }
                Registration::Pending => {
                    *registration = Registration::Idle;
                    return true;
                }
                Registration::Idle | Registration::Retired => return false,
            }
        };
        self.withdraw(id);
        true
    }

    /// Unregister for good. Later `register` calls are no-ops.
    pub fn retire(&self) {
        let previous = std::mem::replace(&mut *self.registration.lock(), Registration::Retired);
        if let Registration::Active(id) = previous {
            self.withdraw(id);
        }
    }

    fn withdraw(&self, id: ServiceId) {
        if let Err(e) = self.registry.unregister(id) {
            warn!(component = %self.name, error = %e, "[Repository] Service already gone");
        }
        debug!(component = %self.name, service_id = id.0, "[Repository] Service unregistered");
    }

    /// True while registered or being registered.
    pub fn is_registered(&self) -> bool {
        matches!(*self.registration.lock(), Registration::Pending | Registration::Active(_))
    }

    pub fn is_retired(&self) -> bool {
        *self.registration.lock() == Registration::Retired
    }

    pub fn service_id(&self) -> Option<ServiceId> {
        match *self.registration.lock() {
            Registration::Active(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Debug for ServiceRegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistrationHandle")
            .field("name", &self.name)
            .field("interfaces", &self.interfaces)
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// Creates the service component on first lookup and caches it.
struct LazyServiceFactory {
    component: String,
    recipe: ValueRecipe,
    repository: Weak<Repository>,
    cached: OnceLock<Instance>,
}

impl ServiceFactory for LazyServiceFactory {
    fn get_service(&self) -> Result<Instance, String> {
        if let Some(instance) = self.cached.get() {
            return Ok(instance.clone());
        }
        let repository = self
            .repository
            .upgrade()
            .ok_or_else(|| format!("container of '{}' has been destroyed", self.component))?;
        let value = repository.evaluate(&self.recipe).map_err(|e| e.to_string())?;
        let instance = value.as_instance().unwrap_or_else(|| Instance::new(value));
        Ok(self.cached.get_or_init(|| instance).clone())
    }
}
