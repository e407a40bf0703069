//! # Container Runtime Library
//!
//! Hosts blueprint containers for a set of modules. The main entry point is
//! the `main.rs` binary; the library is exposed for tests.
//!
//! ## Modules
//!
//! - `adapters/` - event dispatcher and JSON deployment documents
//! - `container/` - the extender, its configuration and errors
//! - `logging` - subscriber installation for the binary

pub mod adapters;
pub mod container;
pub mod logging;

pub use adapters::{DeploymentDocument, EventDispatcher, JsonDescriptionParser, ModuleDocument};
pub use container::{ContainerRuntime, ModuleStatus, RuntimeConfig, RuntimeError};
pub use logging::init_logging;
