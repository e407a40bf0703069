//! Shared host, bean classes and waiters for the integration flows.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bp_03_recipe_graph::{FactoryRegistry, FnFactory, Value};
use bp_04_lifecycle::{BlueprintContainer, ContainerConfig, ContainerContext, StaticDescriptionParser};
use shared_types::host::{
    InMemoryNamespaceRegistry, InMemoryServiceRegistry, ModuleInfo, ServiceEvent, ServiceFilter, ServiceId,
    ServiceListener, ServiceProperties, ServiceRegistry, SingletonServiceFactory,
};
use shared_types::{
    BeanMetadata, BlueprintDescription, ComponentMetadata, ContainerEvent, ContainerEventKind, ContainerListener,
    ContainerState, Instance,
};

// =============================================================================
// BEAN CLASSES
// =============================================================================

/// Instance of the `Node` and `SlowNode` classes.
#[derive(Default)]
pub struct Node {
    pub arguments: Vec<Value>,
    properties: Mutex<BTreeMap<String, Value>>,
}

impl Node {
    pub fn property(&self, name: &str) -> Option<Value> {
        self.properties.lock().get(name).cloned()
    }
}

fn node_factory(created: Arc<AtomicUsize>, journal: Arc<Mutex<Vec<String>>>, delay: Duration) -> FnFactory {
    FnFactory::new(move |arguments| {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        created.fetch_add(1, Ordering::SeqCst);
        Ok(Instance::new(Node {
            arguments,
            ..Default::default()
        }))
    })
    .with_setter(|instance, name, value| {
        let node = instance.downcast_ref::<Node>().ok_or("not a node")?;
        node.properties.lock().insert(name.to_string(), value);
        Ok(())
    })
    .with_invoker(move |_, method| {
        journal.lock().push(method.to_string());
        Ok(())
    })
}

// =============================================================================
// OBSERVERS
// =============================================================================

/// Every lifecycle event delivered to the container listener, in order.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<ContainerEvent>>,
}

impl ContainerListener for EventLog {
    fn container_event(&self, event: &ContainerEvent) {
        self.events.lock().push(event.clone());
    }
}

impl EventLog {
    pub fn kinds(&self) -> Vec<ContainerEventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: ContainerEventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn last(&self, kind: ContainerEventKind) -> Option<ContainerEvent> {
        self.events.lock().iter().rev().find(|e| e.kind == kind).cloned()
    }
}

/// Counts registrations and unregistrations of one interface.
pub struct RegistrationLog {
    interface: String,
    registered: AtomicUsize,
    unregistered: AtomicUsize,
}

impl RegistrationLog {
    pub fn new(interface: &str) -> Arc<Self> {
        Arc::new(Self {
            interface: interface.to_string(),
            registered: AtomicUsize::new(0),
            unregistered: AtomicUsize::new(0),
        })
    }

    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn unregistered(&self) -> usize {
        self.unregistered.load(Ordering::SeqCst)
    }
}

impl ServiceListener for RegistrationLog {
    fn service_changed(&self, event: &ServiceEvent) {
        if !event.reference().interfaces.contains(&self.interface) {
            return;
        }
        match event {
            ServiceEvent::Registered(_) => self.registered.fetch_add(1, Ordering::SeqCst),
            ServiceEvent::Unregistering(_) => self.unregistered.fetch_add(1, Ordering::SeqCst),
            ServiceEvent::Modified(_) => 0,
        };
    }
}

// =============================================================================
// HOST
// =============================================================================

/// In-memory host shared by every container a test starts.
pub struct Host {
    pub services: Arc<InMemoryServiceRegistry>,
    pub handlers: Arc<InMemoryNamespaceRegistry>,
    pub factories: Arc<FactoryRegistry>,
    pub parser: Arc<StaticDescriptionParser>,
    pub events: Arc<EventLog>,
    /// Lifecycle methods invoked on nodes, in call order.
    pub journal: Arc<Mutex<Vec<String>>>,
    created: Arc<AtomicUsize>,
    config: ContainerConfig,
}

impl Host {
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::for_testing())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        let created = Arc::new(AtomicUsize::new(0));
        let journal = Arc::new(Mutex::new(Vec::new()));
        let factories = Arc::new(FactoryRegistry::new());
        factories.register(
            "Node",
            Arc::new(node_factory(Arc::clone(&created), Arc::clone(&journal), Duration::ZERO)),
        );
        factories.register(
            "SlowNode",
            Arc::new(node_factory(
                Arc::clone(&created),
                Arc::clone(&journal),
                Duration::from_millis(50),
            )),
        );

        Self {
            services: Arc::new(InMemoryServiceRegistry::new()),
            handlers: Arc::new(InMemoryNamespaceRegistry::new()),
            factories,
            parser: Arc::new(StaticDescriptionParser::new()),
            events: Arc::new(EventLog::default()),
            journal,
            created,
            config,
        }
    }

    pub fn start(&self, module_id: u64, header: &str, description: BlueprintDescription) -> BlueprintContainer {
        self.parser.insert(module_id, description);
        let context = ContainerContext {
            services: self.services.clone(),
            handlers: self.handlers.clone(),
            factories: Arc::clone(&self.factories),
            parser: self.parser.clone(),
            listener: self.events.clone(),
            defaults: self.config.clone(),
        };
        BlueprintContainer::start(ModuleInfo::new(module_id, header, "1.0.0"), context)
    }

    /// Publish a plain service under `interface`.
    pub fn publish(&self, interface: &str) -> ServiceId {
        self.services.register(
            vec![interface.to_string()],
            Arc::new(SingletonServiceFactory(Instance::new(interface.to_string()))),
            ServiceProperties::new(),
            0,
        )
    }

    pub fn count(&self, interface: &str) -> usize {
        self.services.references(&ServiceFilter::for_interface(interface)).len()
    }

    /// Number of nodes constructed so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }
}

// =============================================================================
// DESCRIPTIONS
// =============================================================================

pub fn description(components: Vec<ComponentMetadata>) -> BlueprintDescription {
    BlueprintDescription {
        components,
        ..Default::default()
    }
}

pub fn node(id: &str) -> BeanMetadata {
    BeanMetadata::new(id, "Node")
}

// =============================================================================
// WAITERS
// =============================================================================

pub async fn reach(container: &BlueprintContainer, state: ContainerState) {
    let mut states = container.watch_state();
    let reached = tokio::time::timeout(Duration::from_secs(30), states.wait_for(|s| *s == state))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);
    assert!(
        reached,
        "container did not reach {state}, stuck in {}",
        container.state()
    );
}

