//! # Host Module System Ports
//!
//! The narrow registration/lookup/listener interface through which a
//! container talks to the module system hosting it. Production hosts
//! implement these traits; `in_memory` provides self-contained versions.

mod in_memory;
mod namespaces;
mod services;

pub use in_memory::{InMemoryNamespaceRegistry, InMemoryServiceRegistry};
pub use namespaces::{
    namespace_filter, NamespaceHandler, NamespaceHandlerRegistry, NamespaceListener,
};
pub use services::{
    ListenerId, ServiceEvent, ServiceFactory, ServiceFilter, ServiceId, ServiceListener,
    ServiceProperties, ServiceReference, ServiceRegistry, SingletonServiceFactory, OBJECT_CLASS,
};

use thiserror::Error;

/// Identity of the module owning a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleInfo {
    pub id: u64,
    /// Raw symbolic-name header, including any `;`-separated directives.
    pub symbolic_name_header: String,
    pub version: String,
}

impl ModuleInfo {
    pub fn new(id: u64, symbolic_name_header: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id,
            symbolic_name_header: symbolic_name_header.into(),
            version: version.into(),
        }
    }

    /// Symbolic name with directives stripped.
    pub fn symbolic_name(&self) -> &str {
        self.symbolic_name_header
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
    }
}

/// Errors raised by host registries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("Unknown service id {0}")]
    UnknownService(u64),

    #[error("Service factory failed: {0}")]
    Factory(String),
}
