//! # Shared Types Crate
//!
//! Types shared by every blueprint subsystem.
//!
//! ## Contents
//!
//! - **Metadata**: the closed tagged-variant model of declarative component
//!   definitions (`ComponentMetadata`, `Metadata`) and the parsed
//!   description consumed by the container.
//! - **Instance**: the type-erased handle to a materialised component.
//! - **Lifecycle**: `ContainerState`, `ContainerEvent` and the listener
//!   contract of the notification sink.
//! - **Errors**: the container error taxonomy.
//! - **Host**: the narrow registration/lookup/listener interface of the
//!   hosting module system, plus in-memory implementations.

pub mod errors;
pub mod events;
pub mod host;
pub mod instance;
pub mod metadata;
pub mod state;

pub use errors::*;
pub use events::*;
pub use host::{HostError, ModuleInfo};
pub use instance::Instance;
pub use metadata::*;
pub use state::ContainerState;
