//! Host callbacks arrive on arbitrary threads. Most only enqueue a command
//! for the actor. Once the container is `Created`, a satisfaction change
//! updates service registrations on the calling thread, so an export whose
//! dependency is lost is withdrawn before the host callback returns.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use bp_02_dependency_tracker::{SatisfactionListener, Satisfiable, SatisfiableDependencies};
use bp_03_recipe_graph::Repository;
use shared_types::host::NamespaceListener;

use crate::domain::Command;

#[derive(Clone)]
struct LiveExports {
    repository: Arc<Repository>,
    dependencies: SatisfiableDependencies,
}

/// Published services of a `Created` container, kept in step with their
/// dependencies from whichever thread reports a change.
#[derive(Default)]
pub struct ExportGate {
    live: RwLock<Option<LiveExports>>,
}

impl ExportGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, repository: Arc<Repository>, dependencies: SatisfiableDependencies) {
        *self.live.write() = Some(LiveExports {
            repository,
            dependencies,
        });
    }

    /// Stop updating. Handles retired afterwards stay unregistered even if
    /// an update is still running on another thread.
    pub fn close(&self) {
        self.live.write().take();
    }

    pub fn is_open(&self) -> bool {
        self.live.read().is_some()
    }

    /// Register every satisfied export and unregister every unsatisfied one.
    /// Returns false when the gate is closed.
    ///
    /// Each handle is re-checked after acting on it, so concurrent updates
    /// from different threads settle on the latest satisfaction.
    pub fn sync(&self) -> bool {
        let Some(exports) = self.live.read().clone() else {
            return false;
        };
        for (name, handle) in exports.repository.service_handles() {
            loop {
                let satisfied = exports.dependencies.is_component_satisfied(&name);
                if handle.is_retired() || satisfied == handle.is_registered() {
                    break;
                }
                if satisfied {
                    debug!(service = %name, "[Lifecycle] Registering service due to satisfied references");
                    handle.register(&exports.repository);
                } else {
                    debug!(service = %name, "[Lifecycle] Unregistering service due to unsatisfied references");
                    handle.unregister();
                }
            }
        }
        true
    }
}

pub struct SatisfactionBridge {
    commands: UnboundedSender<Command>,
    exports: Arc<ExportGate>,
}

impl SatisfactionBridge {
    pub fn new(commands: UnboundedSender<Command>, exports: Arc<ExportGate>) -> Self {
        Self { commands, exports }
    }
}

impl SatisfactionListener for SatisfactionBridge {
    fn notify_satisfaction(&self, satisfiable: &dyn Satisfiable) {
        trace!(dependency = satisfiable.name(), satisfied = satisfiable.is_satisfied(), "[Lifecycle] Satisfaction callback");
        if self.exports.sync() {
            return;
        }
        let _ = self
            .commands
            .send(Command::DependencyChanged(satisfiable.name().to_string()));
    }
}

pub struct NamespaceBridge {
    commands: UnboundedSender<Command>,
}

impl NamespaceBridge {
    pub fn new(commands: UnboundedSender<Command>) -> Self {
        Self { commands }
    }
}

impl NamespaceListener for NamespaceBridge {
    fn handler_registered(&self, namespace: &str) {
        let _ = self
            .commands
            .send(Command::HandlerRegistered(namespace.to_string()));
    }

    fn handler_unregistered(&self, namespace: &str) {
        let _ = self
            .commands
            .send(Command::HandlerUnregistered(namespace.to_string()));
    }
}
