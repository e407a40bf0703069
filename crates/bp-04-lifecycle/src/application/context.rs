//! Collaborators a container is started with.

use std::sync::Arc;

use bp_03_recipe_graph::FactoryRegistry;
use shared_types::host::{NamespaceHandlerRegistry, ServiceRegistry};
use shared_types::ContainerListener;

use crate::config::ContainerConfig;
use crate::ports::outbound::DescriptionParser;

/// Everything outside the container it talks to. Shared by all containers
/// of one runtime.
#[derive(Clone)]
pub struct ContainerContext {
    pub services: Arc<dyn ServiceRegistry>,
    pub handlers: Arc<dyn NamespaceHandlerRegistry>,
    pub factories: Arc<FactoryRegistry>,
    pub parser: Arc<dyn DescriptionParser>,
    pub listener: Arc<dyn ContainerListener>,
    /// Base configuration; module directives override it.
    pub defaults: ContainerConfig,
}
