//! Reference proxies
//!
//! Reference components materialise as proxies that look the service up at
//! call time, so a reference injected before its service appears still
//! resolves once it does.

use std::sync::Arc;

use bp_02_dependency_tracker::ServiceReferenceTracker;
use shared_types::Instance;

/// Proxy for a single-service reference.
#[derive(Debug, Clone)]
pub struct ReferenceProxy {
    tracker: Arc<ServiceReferenceTracker>,
}

impl ReferenceProxy {
    pub fn new(tracker: Arc<ServiceReferenceTracker>) -> Self {
        Self { tracker }
    }

    /// The best matching service, if any is registered.
    pub fn service(&self) -> Option<Instance> {
        self.tracker.best_service()
    }

    /// The best matching service as a trait object.
    pub fn service_as<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.service()?.as_trait::<T>()
    }

    pub fn tracker(&self) -> &Arc<ServiceReferenceTracker> {
        &self.tracker
    }
}

/// Live view over every matching service.
#[derive(Debug, Clone)]
pub struct ReferenceListProxy {
    tracker: Arc<ServiceReferenceTracker>,
}

impl ReferenceListProxy {
    pub fn new(tracker: Arc<ServiceReferenceTracker>) -> Self {
        Self { tracker }
    }

    /// Current services, best first.
    pub fn services(&self) -> Vec<Instance> {
        self.tracker.services()
    }

    pub fn len(&self) -> usize {
        self.services().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services().is_empty()
    }
}
