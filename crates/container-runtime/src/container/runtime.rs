//! # Container Runtime
//!
//! Starts a blueprint container for each hosted module and tears them all
//! down on shutdown. Every container shares the runtime's host registries,
//! factory registry and event dispatcher.
//!
//! ## Shutdown Sequence
//!
//! 1. Destroy containers, most recently started first
//! 2. Flush the event dispatcher

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use bp_03_recipe_graph::FactoryRegistry;
use bp_04_lifecycle::{BlueprintContainer, ContainerContext, DescriptionParser};
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_types::host::{InMemoryNamespaceRegistry, InMemoryServiceRegistry, ModuleInfo};
use shared_types::ContainerState;

use super::config::RuntimeConfig;
use super::errors::RuntimeError;
use crate::adapters::EventDispatcher;

/// Observed state of one hosted module's container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    pub module_id: u64,
    pub symbolic_name: String,
    pub state: ContainerState,
}

pub struct ContainerRuntime {
    services: Arc<InMemoryServiceRegistry>,
    handlers: Arc<InMemoryNamespaceRegistry>,
    factories: Arc<FactoryRegistry>,
    bus: Arc<InMemoryEventBus>,
    dispatcher: Arc<EventDispatcher>,
    context: ContainerContext,
    /// Started containers, in start order.
    containers: RwLock<Vec<BlueprintContainer>>,
}

impl ContainerRuntime {
    /// Create the runtime with in-memory host registries. Must be called
    /// from within a tokio runtime.
    pub fn new(config: RuntimeConfig, parser: Arc<dyn DescriptionParser>) -> Self {
        let services = Arc::new(InMemoryServiceRegistry::new());
        let handlers = Arc::new(InMemoryNamespaceRegistry::new());
        let factories = Arc::new(FactoryRegistry::new());
        let bus = Arc::new(InMemoryEventBus::new());

        let mirror = config
            .mirror_to_bus
            .then(|| Arc::clone(&bus) as Arc<dyn EventPublisher>);
        let dispatcher = EventDispatcher::new(mirror);

        let context = ContainerContext {
            services: services.clone(),
            handlers: handlers.clone(),
            factories: Arc::clone(&factories),
            parser,
            listener: dispatcher.clone(),
            defaults: config.container_defaults,
        };

        Self {
            services,
            handlers,
            factories,
            bus,
            dispatcher,
            context,
            containers: RwLock::new(Vec::new()),
        }
    }

    pub fn services(&self) -> &Arc<InMemoryServiceRegistry> {
        &self.services
    }

    pub fn handlers(&self) -> &Arc<InMemoryNamespaceRegistry> {
        &self.handlers
    }

    pub fn factories(&self) -> &Arc<FactoryRegistry> {
        &self.factories
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Start the container of `module`.
    pub fn start_module(&self, module: ModuleInfo) -> Result<BlueprintContainer, RuntimeError> {
        let mut containers = self.containers.write();
        if containers.iter().any(|c| c.module().id == module.id) {
            return Err(RuntimeError::AlreadyStarted(module.id));
        }
        info!(module = %module.symbolic_name(), module_id = module.id, "[Runtime] Starting module");
        let container = BlueprintContainer::start(module, self.context.clone());
        containers.push(container.clone());
        Ok(container)
    }

    /// Destroy the container of `module_id`. Returns whether one was running.
    pub async fn stop_module(&self, module_id: u64) -> bool {
        let container = {
            let mut containers = self.containers.write();
            let Some(index) = containers.iter().position(|c| c.module().id == module_id) else {
                return false;
            };
            containers.remove(index)
        };
        info!(module = %container.module().symbolic_name(), "[Runtime] Stopping module");
        container.destroy().await;
        true
    }

    pub fn container(&self, module_id: u64) -> Option<BlueprintContainer> {
        self.containers
            .read()
            .iter()
            .find(|c| c.module().id == module_id)
            .cloned()
    }

    /// State of every running container, in start order.
    pub fn statuses(&self) -> Vec<ModuleStatus> {
        self.containers
            .read()
            .iter()
            .map(|c| ModuleStatus {
                module_id: c.module().id,
                symbolic_name: c.module().symbolic_name().to_string(),
                state: c.state(),
            })
            .collect()
    }

    /// Destroy every container, newest first, then flush pending events.
    pub async fn shutdown(&self) {
        info!("[Runtime] Initiating shutdown...");
        let containers = std::mem::take(&mut *self.containers.write());
        for container in containers.iter().rev() {
            container.destroy().await;
        }
        self.dispatcher.shutdown().await;
        if self.services.service_count() > 0 {
            warn!(remaining = self.services.service_count(), "[Runtime] Services left registered by the host");
        }
        info!(containers = containers.len(), "[Runtime] Shutdown complete");
    }
}

impl std::fmt::Debug for ContainerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerRuntime")
            .field("containers", &self.statuses())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DeploymentDocument, JsonDescriptionParser};
    use bp_03_recipe_graph::FnFactory;
    use shared_bus::{EventFilter, EventTopic};
    use shared_types::host::{ServiceFilter, ServiceProperties, ServiceRegistry, SingletonServiceFactory};
    use shared_types::{ContainerEvent, ContainerEventKind, ContainerListener, Instance};
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

    const DOCUMENT: &str = r#"{
        "modules": [
            { "id": 1, "symbolic_name": "com.acme.ready", "version": "1.0.0",
              "description": { "components": [ { "type": "bean", "id": "a", "class_name": "Unit" } ] } },
            { "id": 2, "symbolic_name": "com.acme.waiting", "version": "1.0.0",
              "description": { "components": [ { "type": "reference", "id": "db", "interface": "DataSource" } ] } }
        ]
    }"#;

    struct ChannelListener(UnboundedSender<ContainerEvent>);

    impl ContainerListener for ChannelListener {
        fn container_event(&self, event: &ContainerEvent) {
            let _ = self.0.send(event.clone());
        }
    }

    fn runtime() -> (ContainerRuntime, DeploymentDocument) {
        let document = DeploymentDocument::from_json(DOCUMENT).unwrap();
        let parser = Arc::new(JsonDescriptionParser::new(document.clone()));
        let runtime = ContainerRuntime::new(RuntimeConfig::for_testing(), parser);
        runtime
            .factories()
            .register("Unit", Arc::new(FnFactory::new(|_| Ok(Instance::new(())))));
        (runtime, document)
    }

    async fn next_of(
        rx: &mut UnboundedReceiver<ContainerEvent>,
        module: u64,
        kind: ContainerEventKind,
    ) -> ContainerEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("event not delivered in time")
                .expect("dispatcher closed");
            if event.module.id == module && event.kind == kind {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn test_modules_start_and_report_state() {
        let (runtime, document) = runtime();
        let (tx, mut rx) = mpsc::unbounded_channel();
        runtime.dispatcher().add_listener(Arc::new(ChannelListener(tx)));

        for module in document.modules() {
            runtime.start_module(module).unwrap();
        }
        next_of(&mut rx, 1, ContainerEventKind::Created).await;
        let grace = next_of(&mut rx, 2, ContainerEventKind::GracePeriod).await;
        assert_eq!(grace.module.symbolic_name(), "com.acme.waiting");

        let statuses = runtime.statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].state, ContainerState::Created);
        assert_eq!(statuses[1].state, ContainerState::WaitingForInitialRefs);

        runtime.services().register(
            vec!["DataSource".into()],
            Arc::new(SingletonServiceFactory(Instance::new(()))),
            ServiceProperties::new(),
            0,
        );
        next_of(&mut rx, 2, ContainerEventKind::Created).await;
        assert_eq!(
            runtime
                .services()
                .references(&ServiceFilter::for_interface(bp_04_lifecycle::CONTAINER_INTERFACE))
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_module_started_once() {
        let (runtime, document) = runtime();
        let module = document.modules()[0].clone();
        runtime.start_module(module.clone()).unwrap();
        assert!(matches!(runtime.start_module(module), Err(RuntimeError::AlreadyStarted(1))));
    }

    #[tokio::test]
    async fn test_stop_module_destroys_container() {
        let (runtime, document) = runtime();
        let (tx, mut rx) = mpsc::unbounded_channel();
        runtime.dispatcher().add_listener(Arc::new(ChannelListener(tx)));
        let container = runtime.start_module(document.modules()[0].clone()).unwrap();
        next_of(&mut rx, 1, ContainerEventKind::Created).await;

        assert!(runtime.stop_module(1).await);
        assert!(container.is_destroyed());
        assert!(runtime.container(1).is_none());
        assert!(!runtime.stop_module(1).await);
        next_of(&mut rx, 1, ContainerEventKind::Destroyed).await;
    }

    #[tokio::test]
    async fn test_shutdown_destroys_all_and_mirrors_events() {
        let (runtime, document) = runtime();
        let mut destroyed = runtime
            .bus()
            .subscribe(EventFilter::topics(vec![EventTopic::Destroyed]));
        let containers: Vec<_> = document
            .modules()
            .into_iter()
            .map(|m| runtime.start_module(m).unwrap())
            .collect();

        runtime.shutdown().await;
        assert!(containers.iter().all(BlueprintContainer::is_destroyed));
        assert!(runtime.statuses().is_empty());
        assert_eq!(runtime.services().service_count(), 0);

        // Newest first.
        assert_eq!(destroyed.recv().await.unwrap().module_id, 2);
        assert_eq!(destroyed.recv().await.unwrap().module_id, 1);
    }

    #[tokio::test]
    async fn test_late_listener_sees_current_states() {
        let (runtime, document) = runtime();
        let (tx, mut rx) = mpsc::unbounded_channel();
        runtime.dispatcher().add_listener(Arc::new(ChannelListener(tx)));
        runtime.start_module(document.modules()[0].clone()).unwrap();
        next_of(&mut rx, 1, ContainerEventKind::Created).await;

        let (late_tx, mut late_rx) = mpsc::unbounded_channel();
        runtime.dispatcher().add_listener(Arc::new(ChannelListener(late_tx)));
        let replayed = next_of(&mut late_rx, 1, ContainerEventKind::Created).await;
        assert!(replayed.replay);
    }
}
