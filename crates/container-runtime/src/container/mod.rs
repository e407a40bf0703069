//! # Runtime Container
//!
//! The extender: one blueprint container per hosted module, sharing the
//! host registries, the factory registry and the event dispatcher.

pub mod config;
pub mod errors;
pub mod runtime;

pub use config::RuntimeConfig;
pub use errors::RuntimeError;
pub use runtime::{ContainerRuntime, ModuleStatus};
