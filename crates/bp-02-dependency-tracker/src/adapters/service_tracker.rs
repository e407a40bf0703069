//! Service reference tracker
//!
//! A satisfiable watching the host service registry for services matching a
//! reference's interface and property filter.
//!
//! The tracked set and listener live under one mutex. Notifications are
//! delivered after it is released but under a reentrant delivery lock that
//! `stop` also takes: once `stop` returns no further notification can be
//! delivered, and a listener may still call back into the registry.

use parking_lot::{Mutex, ReentrantMutex};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use shared_types::host::{
    ListenerId, ServiceEvent, ServiceFilter, ServiceId, ServiceListener, ServiceReference,
    ServiceRegistry,
};
use shared_types::{Availability, Instance, ReferenceMetadata};

use crate::domain::satisfiable::{SatisfactionListener, Satisfiable};

#[derive(Default)]
struct TrackerState {
    listener: Option<Arc<dyn SatisfactionListener>>,
    registration: Option<ListenerId>,
    tracked: BTreeMap<ServiceId, ServiceReference>,
}

pub struct ServiceReferenceTracker {
    name: String,
    filter: ServiceFilter,
    optional: bool,
    registry: Arc<dyn ServiceRegistry>,
    satisfied: AtomicBool,
    state: Mutex<TrackerState>,
    delivery: ReentrantMutex<()>,
    this: Weak<ServiceReferenceTracker>,
}

impl ServiceReferenceTracker {
    pub fn new(
        name: impl Into<String>,
        filter: ServiceFilter,
        optional: bool,
        registry: Arc<dyn ServiceRegistry>,
    ) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|this| Self {
            name,
            filter,
            optional,
            registry,
            satisfied: AtomicBool::new(optional),
            state: Mutex::new(TrackerState::default()),
            delivery: ReentrantMutex::new(()),
            this: this.clone(),
        })
    }

    /// Tracker for a reference or reference-list definition.
    pub fn for_reference(
        name: impl Into<String>,
        metadata: &ReferenceMetadata,
        registry: Arc<dyn ServiceRegistry>,
    ) -> Arc<Self> {
        let filter = ServiceFilter {
            interface: Some(metadata.interface.clone()),
            properties: metadata.filter.clone(),
        };
        Self::new(
            name,
            filter,
            metadata.availability == Availability::Optional,
            registry,
        )
    }

    pub fn service_filter(&self) -> &ServiceFilter {
        &self.filter
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().listener.is_some()
    }

    /// Number of matching services currently tracked.
    pub fn tracked_count(&self) -> usize {
        self.state.lock().tracked.len()
    }

    /// The best matching service right now: highest ranking, then lowest id.
    pub fn best_service(&self) -> Option<Instance> {
        self.registry
            .references(&self.filter)
            .into_iter()
            .find_map(|r| self.lookup(&r))
    }

    /// Every matching service right now, best first.
    pub fn services(&self) -> Vec<Instance> {
        self.registry
            .references(&self.filter)
            .into_iter()
            .filter_map(|r| self.lookup(&r))
            .collect()
    }

    fn lookup(&self, reference: &ServiceReference) -> Option<Instance> {
        match self.registry.get_service(reference.id) {
            Ok(instance) => Some(instance),
            Err(e) => {
                warn!(tracker = %self.name, service_id = reference.id.0, error = %e, "[Tracker] Service lookup failed");
                None
            }
        }
    }

    fn on_service_event(&self, event: &ServiceEvent) {
        let _delivery = self.delivery.lock();
        let listener = {
            let mut state = self.state.lock();
            let Some(listener) = state.listener.clone() else {
                return;
            };
            let reference = event.reference();
            match event {
                ServiceEvent::Registered(_) | ServiceEvent::Modified(_) if self.filter.matches(reference) => {
                    state.tracked.insert(reference.id, reference.clone());
                }
                _ => {
                    state.tracked.remove(&reference.id);
                }
            }
            let satisfied = self.optional || !state.tracked.is_empty();
            if self.satisfied.swap(satisfied, Ordering::SeqCst) == satisfied {
                return;
            }
            debug!(tracker = %self.name, satisfied, "[Tracker] Satisfaction changed");
            listener
        };
        listener.notify_satisfaction(self);
    }
}

impl Satisfiable for ServiceReferenceTracker {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, listener: Arc<dyn SatisfactionListener>) {
        let mut state = self.state.lock();
        if state.listener.is_some() {
            return;
        }
        state.listener = Some(listener);
        let callback = Arc::new(TrackerCallback {
            tracker: self.this.clone(),
        });
        state.registration = Some(self.registry.add_listener(self.filter.clone(), callback));
        state.tracked = self
            .registry
            .references(&self.filter)
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        let satisfied = self.optional || !state.tracked.is_empty();
        self.satisfied.store(satisfied, Ordering::SeqCst);
        debug!(tracker = %self.name, filter = %self.filter, satisfied, "[Tracker] Started");
    }

    fn stop(&self) {
        let _delivery = self.delivery.lock();
        let mut state = self.state.lock();
        if let Some(registration) = state.registration.take() {
            self.registry.remove_listener(registration);
        }
        if state.listener.take().is_some() {
            debug!(tracker = %self.name, "[Tracker] Stopped");
        }
        state.tracked.clear();
        self.satisfied.store(self.optional, Ordering::SeqCst);
    }

    fn is_satisfied(&self) -> bool {
        self.satisfied.load(Ordering::SeqCst)
    }

    fn filter(&self) -> String {
        self.filter.to_string()
    }
}

impl std::fmt::Debug for ServiceReferenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceReferenceTracker")
            .field("name", &self.name)
            .field("filter", &self.filter.to_string())
            .field("satisfied", &self.is_satisfied())
            .finish()
    }
}

/// Registry listener forwarding to a tracker without keeping it alive.
struct TrackerCallback {
    tracker: Weak<ServiceReferenceTracker>,
}

impl ServiceListener for TrackerCallback {
    fn service_changed(&self, event: &ServiceEvent) {
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.on_service_event(event);
        }
    }
}
