//! # Container Actor
//!
//! Sole owner of a container's lifecycle state. Commands arrive on one
//! channel and are processed in order, so a pass never races another pass,
//! the timeout, a host callback or teardown.
//!
//! ```text
//! Unknown ─→ WaitingForHandlers ─→ Populated ─→ WaitingForInitialRefs
//!                 ↑ (handler removed)                  │
//!                 │                          InitialRefsSatisfied
//!                 │                                    │
//!               Created ←── Creating ←── WaitingForInitialRefs2
//!
//!   any phase ──(error or timeout)──→ Failed
//! ```

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use bp_01_definition_registry::{
    metadata_of_kind, missing_namespaces, populate, ComponentDefinitionRegistry, RegistryError,
    RegistryProcessor,
};
use bp_02_dependency_tracker::{SatisfactionListener, SatisfiableDependencies};
use bp_03_recipe_graph::{BeanProcessor, Converter, RecipeBuilder, Repository};
use shared_types::host::{
    namespace_filter, ListenerId, ServiceId, ServiceProperties, SingletonServiceFactory,
};
use shared_types::{
    BlueprintDescription, ComponentMetadata, ContainerError, ContainerEvent, ContainerEventKind,
    ContainerState, Instance, MetadataKind,
};

use super::container::{
    BlueprintContainer, Shared, CONTAINER_INTERFACE, SYMBOLIC_NAME_PROPERTY, VERSION_PROPERTY,
};
use super::context::ContainerContext;
use crate::adapters::bridges::{ExportGate, NamespaceBridge, SatisfactionBridge};
use crate::config::ContainerConfig;
use crate::domain::Command;

pub(crate) struct ContainerActor {
    shared: Arc<Shared>,
    context: ContainerContext,
    config: ContainerConfig,
    state: ContainerState,
    description: Option<BlueprintDescription>,
    namespaces: BTreeSet<String>,
    namespace_listener: Option<ListenerId>,
    definitions: ComponentDefinitionRegistry,
    repository: Option<Arc<Repository>>,
    dependencies: Option<SatisfiableDependencies>,
    satisfaction: Arc<dyn SatisfactionListener>,
    exports: Arc<ExportGate>,
    timeout: Option<JoinHandle<()>>,
    timeout_generation: u64,
    registration: Option<ServiceId>,
}

impl ContainerActor {
    pub(crate) fn new(shared: Arc<Shared>, context: ContainerContext) -> Self {
        let exports = Arc::new(ExportGate::new());
        let satisfaction: Arc<dyn SatisfactionListener> =
            Arc::new(SatisfactionBridge::new(shared.commands.clone(), Arc::clone(&exports)));
        Self {
            config: context.defaults.clone(),
            shared,
            context,
            state: ContainerState::Unknown,
            description: None,
            namespaces: BTreeSet::new(),
            namespace_listener: None,
            definitions: ComponentDefinitionRegistry::new(),
            repository: None,
            dependencies: None,
            satisfaction,
            exports,
            timeout: None,
            timeout_generation: 0,
            registration: None,
        }
    }

    pub(crate) async fn run(mut self, mut commands: UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Destroy(done) => {
                    self.destroy();
                    let _ = done.send(());
                    break;
                }
                _ if self.shared.is_destroyed() => {}
                Command::Run => {
                    self.shared
                        .scheduled
                        .store(false, std::sync::atomic::Ordering::SeqCst);
                    self.run_pass();
                }
                Command::HandlerRegistered(namespace) => {
                    if self.namespaces.contains(&namespace) {
                        self.shared.schedule();
                    }
                }
                Command::HandlerUnregistered(namespace) => self.on_handler_unregistered(&namespace),
                Command::DependencyChanged(name) => self.on_dependency_changed(&name),
                Command::TimeoutFired(generation) => self.on_timeout(generation),
            }
        }
        debug!(module = %self.module_name(), "[Lifecycle] Actor stopped");
    }

    // =========================================================================
    // State machine
    // =========================================================================

    fn run_pass(&mut self) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.drive()));
        let result = outcome.unwrap_or_else(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            Err(ContainerError::definition(format!("container pass panicked: {reason}")))
        });
        if let Err(error) = result {
            self.fail(error);
        }
    }

    fn drive(&mut self) -> Result<(), ContainerError> {
        loop {
            if self.shared.is_destroyed() {
                return Ok(());
            }
            debug!(module = %self.module_name(), state = %self.state, "[Lifecycle] Running container");
            match self.state {
                ContainerState::Unknown => self.parse_description()?,
                ContainerState::WaitingForHandlers => {
                    if !self.populate_registry()? {
                        return Ok(());
                    }
                }
                ContainerState::Populated => self.build_repository()?,
                ContainerState::WaitingForInitialRefs => {
                    if !self.dependencies_ready() {
                        self.grace_period(self.missing_dependencies());
                        return Ok(());
                    }
                    self.set_state(ContainerState::InitialRefsSatisfied);
                }
                ContainerState::InitialRefsSatisfied => {
                    self.process_type_converters()?;
                    self.process_processors()?;
                    self.set_state(ContainerState::WaitingForInitialRefs2);
                }
                ContainerState::WaitingForInitialRefs2 => {
                    if !self.dependencies_ready() {
                        self.grace_period(self.missing_dependencies());
                        return Ok(());
                    }
                    self.set_state(ContainerState::Creating);
                }
                ContainerState::Creating => self.create_components()?,
                ContainerState::Created | ContainerState::Failed => return Ok(()),
            }
        }
    }

    fn parse_description(&mut self) -> Result<(), ContainerError> {
        self.config = self
            .context
            .defaults
            .clone()
            .apply_directives(&self.shared.module.symbolic_name_header)?;
        self.emit(ContainerEvent::new(ContainerEventKind::Creating, self.shared.module.clone()));

        let description = self
            .context
            .parser
            .parse(&self.shared.module, self.config.xml_validation)?;
        self.namespaces = description.namespaces();
        if !self.namespaces.is_empty() && self.namespace_listener.is_none() {
            let bridge = Arc::new(NamespaceBridge::new(self.shared.commands.clone()));
            self.namespace_listener = Some(self.context.handlers.add_listener(bridge));
        }
        self.description = Some(description);
        self.set_state(ContainerState::WaitingForHandlers);
        Ok(())
    }

    /// Returns false while a namespace handler is missing.
    fn populate_registry(&mut self) -> Result<bool, ContainerError> {
        let Some(description) = self.description.as_ref() else {
            return Err(ContainerError::definition("description has not been parsed"));
        };
        let missing = missing_namespaces(description, self.context.handlers.as_ref());
        if !missing.is_empty() {
            self.grace_period(missing.iter().map(|ns| namespace_filter(ns)).collect());
            return Ok(false);
        }
        self.definitions = populate(description, self.context.handlers.as_ref())?;
        self.publish_definitions();
        self.set_state(ContainerState::Populated);
        Ok(true)
    }

    fn build_repository(&mut self) -> Result<(), ContainerError> {
        let recipes = RecipeBuilder::new(Arc::clone(&self.context.services)).build(&self.definitions)?;
        let repository = Repository::new(recipes, Arc::clone(&self.context.factories));
        *self.shared.repository.write() = Some(Arc::clone(&repository));
        self.repository = Some(repository);
        self.track_dependencies();
        self.arm_timeout();
        self.set_state(ContainerState::WaitingForInitialRefs);
        Ok(())
    }

    fn process_type_converters(&mut self) -> Result<(), ContainerError> {
        let names = self.definitions.type_converters().to_vec();
        if names.is_empty() {
            return Ok(());
        }
        let repository = self.repository()?;
        let instances = repository.create_all(&names)?;
        for (name, instance) in names.iter().zip(instances) {
            let converter = instance.as_trait::<dyn Converter>().ok_or_else(|| {
                ContainerError::definition(format!("type converter '{name}' does not implement Converter"))
            })?;
            repository.converter().register(converter);
        }
        debug!(count = names.len(), "[Lifecycle] Type converters registered");
        Ok(())
    }

    fn process_processors(&mut self) -> Result<(), ContainerError> {
        let processors: Vec<String> = metadata_of_kind(&self.definitions, MetadataKind::Bean)
            .into_iter()
            .filter_map(|node| match node.as_component()? {
                ComponentMetadata::Bean(bean) if bean.processor => Some(bean.id.clone()),
                _ => None,
            })
            .filter(|id| self.definitions.contains(id))
            .collect();

        for id in processors {
            let repository = self.repository()?;
            let instance = repository.create(&id)?;
            if let Some(processor) = instance.as_trait::<dyn RegistryProcessor>() {
                debug!(processor = %id, "[Lifecycle] Running registry processor");
                processor
                    .process(&mut self.definitions)
                    .map_err(|reason| RegistryError::ProcessorFailed {
                        processor: id.clone(),
                        reason,
                    })?;
                self.rebuild_recipes()?;
            } else if let Some(processor) = instance.as_trait::<dyn BeanProcessor>() {
                debug!(processor = %id, "[Lifecycle] Bean processor installed");
                repository.add_processor(processor);
            } else {
                return Err(ContainerError::definition(format!(
                    "processor '{id}' implements neither RegistryProcessor nor BeanProcessor"
                )));
            }
        }
        Ok(())
    }

    /// Rebuild recipes from the rewritten registry. Materialised names keep
    /// their recipes; the dependency map is recomputed.
    fn rebuild_recipes(&mut self) -> Result<(), ContainerError> {
        self.untrack_dependencies();
        let recipes = RecipeBuilder::new(Arc::clone(&self.context.services)).build(&self.definitions)?;
        self.repository()?.replace_recipes(recipes);
        self.publish_definitions();
        self.track_dependencies();
        Ok(())
    }

    fn create_components(&mut self) -> Result<(), ContainerError> {
        self.cancel_timeout();
        self.register_services();

        let eager: Vec<String> = self
            .definitions
            .components()
            .filter(|c| c.is_eager())
            .map(|c| c.id().to_string())
            .collect();
        debug!(components = ?eager, "[Lifecycle] Instantiating eager components");
        let repository = self.repository()?;
        repository.create_all(&eager)?;

        // From here on satisfaction changes update exports on the host's thread.
        self.exports
            .open(repository, self.dependencies.clone().unwrap_or_default());
        self.exports.sync();
        self.publish_container();
        info!(module = %self.module_name(), "[Lifecycle] Container created");
        self.emit(ContainerEvent::new(ContainerEventKind::Created, self.shared.module.clone()));
        self.set_state(ContainerState::Created);
        Ok(())
    }

    fn set_state(&mut self, state: ContainerState) {
        debug!(module = %self.module_name(), from = %self.state, to = %state, "[Lifecycle] State transition");
        self.state = state;
        self.shared.state.send_replace(state);
    }

    // =========================================================================
    // Dependencies
    // =========================================================================

    fn track_dependencies(&mut self) {
        let Some(repository) = &self.repository else {
            return;
        };
        let dependencies = repository.satisfiable_dependencies();
        dependencies.track_all(Arc::clone(&self.satisfaction));
        debug!(count = dependencies.distinct().len(), "[Lifecycle] Tracking dependencies");
        self.dependencies = Some(dependencies);
    }

    fn untrack_dependencies(&self) {
        if let Some(dependencies) = &self.dependencies {
            dependencies.untrack_all();
        }
    }

    fn dependencies_ready(&self) -> bool {
        !self.config.wait_for_dependencies
            || self.dependencies.as_ref().map_or(true, SatisfiableDependencies::all_satisfied)
    }

    fn component_satisfied(&self, name: &str) -> bool {
        self.dependencies
            .as_ref()
            .map_or(true, |d| d.is_component_satisfied(name))
    }

    fn missing_dependencies(&self) -> Vec<String> {
        self.dependencies
            .as_ref()
            .map(SatisfiableDependencies::missing_filters)
            .unwrap_or_default()
    }

    fn on_dependency_changed(&mut self, name: &str) {
        if self.dependencies.is_none() {
            return;
        }
        debug!(module = %self.module_name(), dependency = name, state = %self.state, "[Lifecycle] Dependency changed");
        match self.state {
            ContainerState::WaitingForInitialRefs | ContainerState::WaitingForInitialRefs2 => {
                self.shared.schedule();
            }
            ContainerState::Created => {
                self.exports.sync();
            }
            _ => {}
        }
    }

    fn on_handler_unregistered(&mut self, namespace: &str) {
        if !self.namespaces.contains(namespace)
            || matches!(
                self.state,
                ContainerState::Unknown | ContainerState::WaitingForHandlers | ContainerState::Failed
            )
        {
            return;
        }
        warn!(module = %self.module_name(), namespace, "[Lifecycle] Namespace handler removed, restarting container");
        self.cleanup();
        self.repository = None;
        self.dependencies = None;
        self.definitions = ComponentDefinitionRegistry::new();
        *self.shared.repository.write() = None;
        *self.shared.definitions.write() = None;
        self.set_state(ContainerState::WaitingForHandlers);
        self.shared.schedule();
    }

    // =========================================================================
    // Services
    // =========================================================================

    fn register_services(&self) {
        let Some(repository) = &self.repository else {
            return;
        };
        for (name, handle) in repository.service_handles() {
            if self.component_satisfied(&name) {
                handle.register(repository);
            }
        }
    }

    fn retire_services(&self) {
        self.exports.close();
        if let Some(repository) = &self.repository {
            for (_, handle) in repository.service_handles() {
                handle.retire();
            }
        }
    }

    fn publish_container(&mut self) {
        if self.registration.is_some() {
            return;
        }
        let module = &self.shared.module;
        let mut properties = ServiceProperties::new();
        properties.insert(SYMBOLIC_NAME_PROPERTY.to_string(), module.symbolic_name().to_string());
        properties.insert(VERSION_PROPERTY.to_string(), module.version.clone());
        let handle = BlueprintContainer::from_shared(Arc::clone(&self.shared));
        let id = self.context.services.register(
            vec![CONTAINER_INTERFACE.to_string()],
            Arc::new(SingletonServiceFactory(Instance::new(handle))),
            properties,
            0,
        );
        self.registration = Some(id);
    }

    fn unpublish_container(&mut self) {
        if let Some(id) = self.registration.take() {
            if let Err(e) = self.context.services.unregister(id) {
                warn!(error = %e, "[Lifecycle] Container service already gone");
            }
        }
    }

    // =========================================================================
    // Timeout, failure and teardown
    // =========================================================================

    fn arm_timeout(&mut self) {
        self.cancel_timeout();
        self.timeout_generation += 1;
        let generation = self.timeout_generation;
        let delay = self.config.timeout;
        let commands = self.shared.commands.clone();
        self.timeout = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(Command::TimeoutFired(generation));
        }));
    }

    fn cancel_timeout(&mut self) {
        if let Some(timer) = self.timeout.take() {
            timer.abort();
        }
    }

    fn on_timeout(&mut self, generation: u64) {
        if generation != self.timeout_generation || self.timeout.take().is_none() {
            return;
        }
        if matches!(self.state, ContainerState::Created | ContainerState::Failed) {
            return;
        }
        let error = ContainerError::timeout(self.config.timeout, self.missing_dependencies());
        self.fail(error);
    }

    /// Force `Failed` with full cleanup. Reports each failure once.
    fn fail(&mut self, error: ContainerError) {
        if self.state == ContainerState::Failed {
            return;
        }
        let missing = self.missing_dependencies();
        self.cleanup();
        error!(module = %self.module_name(), error = %error, "[Lifecycle] Unable to start container");
        self.emit(
            ContainerEvent::new(ContainerEventKind::Failure, self.shared.module.clone())
                .with_dependencies(missing)
                .with_error(error),
        );
        self.set_state(ContainerState::Failed);
    }

    /// Unregister, untrack, destroy. Safe to repeat.
    fn cleanup(&mut self) {
        self.cancel_timeout();
        self.unpublish_container();
        self.retire_services();
        self.untrack_dependencies();
        if let Some(repository) = &self.repository {
            repository.destroy();
        }
    }

    fn destroy(&mut self) {
        info!(module = %self.module_name(), state = %self.state, "[Lifecycle] Destroying container");
        self.emit(ContainerEvent::new(ContainerEventKind::Destroying, self.shared.module.clone()));
        if let Some(id) = self.namespace_listener.take() {
            self.context.handlers.remove_listener(id);
        }
        self.cleanup();
        self.emit(ContainerEvent::new(ContainerEventKind::Destroyed, self.shared.module.clone()));
        debug!(module = %self.module_name(), "[Lifecycle] Container destroyed");
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn grace_period(&self, missing: Vec<String>) {
        info!(module = %self.module_name(), missing = ?missing, "[Lifecycle] Waiting in grace period");
        self.emit(
            ContainerEvent::new(ContainerEventKind::GracePeriod, self.shared.module.clone())
                .with_dependencies(missing),
        );
    }

    fn emit(&self, event: ContainerEvent) {
        self.context.listener.container_event(&event);
    }

    fn publish_definitions(&self) {
        *self.shared.definitions.write() = Some(Arc::new(self.definitions.clone()));
    }

    fn repository(&self) -> Result<Arc<Repository>, ContainerError> {
        self.repository
            .clone()
            .ok_or_else(|| ContainerError::definition("repository has not been built"))
    }

    fn module_name(&self) -> &str {
        self.shared.module.symbolic_name()
    }
}
