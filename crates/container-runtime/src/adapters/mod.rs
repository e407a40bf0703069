//! # Adapters
//!
//! Event dispatch to listeners and the bus, and the JSON description source.

pub mod event_dispatcher;
pub mod json_parser;

pub use event_dispatcher::{EventDispatcher, ListenerHandle, MIRROR_DRAIN_TIMEOUT};
pub use json_parser::{DeploymentDocument, JsonDescriptionParser, ModuleDocument};
