//! # BP-01: Component Definition Registry
//!
//! Holds the declarative metadata of every named component of one
//! container generation.
//!
//! ## Architecture
//!
//! - **Domain**: `ComponentDefinitionRegistry` and its errors
//! - **Algorithms**: recursive metadata query over every registered definition
//! - **Ports**: `RegistryProcessor`, the outbound hook that may rewrite a
//!   populated registry
//! - **Application**: population from a parsed description, expanding
//!   custom elements through namespace handlers

pub mod algorithms;
pub mod application;
pub mod domain;
pub mod ports;

pub use algorithms::metadata_walk::{metadata_of_kind, MetadataNode};
pub use application::populator::{missing_namespaces, populate};
pub use domain::errors::RegistryError;
pub use domain::registry::ComponentDefinitionRegistry;
pub use ports::outbound::RegistryProcessor;
