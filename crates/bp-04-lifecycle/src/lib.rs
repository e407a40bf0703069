//! # BP-04: Lifecycle State Machine
//!
//! Drives a container from an unparsed description to an active set of
//! components, or to failure, through a fixed sequence of resumable phases.
//!
//! ## Architecture
//!
//! - **Domain**: the `Command` vocabulary of a container actor
//! - **Ports**: `DescriptionParser`
//! - **Adapters**: `StaticDescriptionParser` and the bridges turning host
//!   callbacks into commands
//! - **Application**: `BlueprintContainer` (the public handle) and the actor
//!   owning all lifecycle state
//!
//! ## Scheduling
//!
//! `schedule()` may be called from any thread. A flag collapses concurrent
//! requests into one pending pass; the actor clears it before running, so a
//! request made during a pass always yields exactly one more pass. Host
//! callbacks, the dependency timer and teardown are commands on the same
//! channel and never run concurrently with a pass. The one exception is a
//! satisfaction change after `Created`: the `ExportGate` updates service
//! registrations on the host's thread, before its callback returns.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{ExportGate, StaticDescriptionParser};
pub use application::container::{
    BlueprintContainer, CONTAINER_INTERFACE, SYMBOLIC_NAME_PROPERTY, VERSION_PROPERTY,
};
pub use application::context::ContainerContext;
pub use config::ContainerConfig;
pub use ports::DescriptionParser;
