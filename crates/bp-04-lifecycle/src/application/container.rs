//! # Blueprint Container
//!
//! Cheap, clonable handle to one running container. All state transitions
//! happen inside the container's actor; the handle only enqueues commands
//! and reads published snapshots.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tracing::info;

use bp_01_definition_registry::{metadata_of_kind, ComponentDefinitionRegistry};
use bp_03_recipe_graph::Repository;
use shared_types::host::ModuleInfo;
use shared_types::{ComponentMetadata, ContainerError, ContainerState, Instance, MetadataKind};

use super::actor::ContainerActor;
use super::context::ContainerContext;
use crate::domain::Command;

/// Interface the container publishes itself under once created.
pub const CONTAINER_INTERFACE: &str = "org.osgi.service.blueprint.container.BlueprintContainer";
pub const SYMBOLIC_NAME_PROPERTY: &str = "osgi.blueprint.container.symbolicname";
pub const VERSION_PROPERTY: &str = "osgi.blueprint.container.version";

/// State shared between the handle and the actor.
pub(crate) struct Shared {
    pub(crate) module: ModuleInfo,
    pub(crate) state: watch::Sender<ContainerState>,
    pub(crate) definitions: RwLock<Option<Arc<ComponentDefinitionRegistry>>>,
    pub(crate) repository: RwLock<Option<Arc<Repository>>>,
    pub(crate) scheduled: AtomicBool,
    pub(crate) destroyed: AtomicBool,
    pub(crate) commands: UnboundedSender<Command>,
}

impl Shared {
    /// Request a pass. At most one request is pending at a time.
    pub(crate) fn schedule(&self) {
        if self
            .scheduled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            && self.commands.send(Command::Run).is_err()
        {
            self.scheduled.store(false, Ordering::SeqCst);
        }
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct BlueprintContainer {
    shared: Arc<Shared>,
}

impl BlueprintContainer {
    /// Spawn the container's actor and schedule its first pass. Must be
    /// called from within a tokio runtime.
    pub fn start(module: ModuleInfo, context: ContainerContext) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ContainerState::Unknown);
        info!(module = %module.symbolic_name(), module_id = module.id, "[Lifecycle] Starting container");

        let shared = Arc::new(Shared {
            module,
            state,
            definitions: RwLock::new(None),
            repository: RwLock::new(None),
            scheduled: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            commands,
        });
        let actor = ContainerActor::new(Arc::clone(&shared), context);
        tokio::spawn(actor.run(receiver));

        let container = Self { shared };
        container.schedule();
        container
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.shared.module
    }

    pub fn state(&self) -> ContainerState {
        *self.shared.state.borrow()
    }

    /// Receiver observing every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ContainerState> {
        self.shared.state.subscribe()
    }

    /// Request a re-evaluation pass. Safe from any thread; concurrent
    /// requests collapse into one.
    pub fn schedule(&self) {
        self.shared.schedule();
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.is_destroyed()
    }

    /// Ids of every top-level component, in registration order. Empty until
    /// the registry is populated.
    pub fn component_ids(&self) -> Vec<String> {
        self.shared
            .definitions
            .read()
            .as_ref()
            .map(|d| d.names().to_vec())
            .unwrap_or_default()
    }

    pub fn component_metadata(&self, id: &str) -> Result<ComponentMetadata, ContainerError> {
        self.shared
            .definitions
            .read()
            .as_ref()
            .and_then(|d| d.get(id).cloned())
            .ok_or_else(|| ContainerError::NoSuchComponent(id.to_string()))
    }

    /// Every component of `kind` reachable from the registry, inline ones
    /// included.
    pub fn components_of_kind(&self, kind: MetadataKind) -> Vec<ComponentMetadata> {
        let Some(definitions) = self.shared.definitions.read().clone() else {
            return Vec::new();
        };
        metadata_of_kind(&definitions, kind)
            .into_iter()
            .filter_map(|node| node.as_component().cloned())
            .collect()
    }

    /// The live instance of `id`, created on demand.
    pub fn component_instance(&self, id: &str) -> Result<Instance, ContainerError> {
        if self.is_destroyed() {
            return Err(ContainerError::Destroyed);
        }
        let repository = self
            .shared
            .repository
            .read()
            .clone()
            .ok_or_else(|| ContainerError::NoSuchComponent(id.to_string()))?;
        Ok(repository.create(id)?)
    }

    /// Tear the container down. Waits for an in-flight pass to finish
    /// first; later calls return immediately.
    pub async fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let (done, finished) = oneshot::channel();
        if self.shared.commands.send(Command::Destroy(done)).is_err() {
            return;
        }
        let _ = finished.await;
    }
}

impl std::fmt::Debug for BlueprintContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlueprintContainer")
            .field("module", &self.shared.module.symbolic_name())
            .field("state", &self.state())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
