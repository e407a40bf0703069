//! Ports for the definition registry.

pub mod outbound;

pub use outbound::RegistryProcessor;
