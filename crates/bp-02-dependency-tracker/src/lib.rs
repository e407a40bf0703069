//! # BP-02: Satisfiable Dependency Tracker
//!
//! Every metadata node naming an external-service dependency becomes a
//! watchable satisfiable unit with start/stop/is-satisfied semantics. A
//! component's satisfaction is the AND over its distinct direct units.
//!
//! ## Architecture
//!
//! - **Domain**: `Satisfiable` and `SatisfactionListener` contracts
//! - **Adapters**: `ServiceReferenceTracker`, a satisfiable backed by the
//!   host service registry
//! - **Application**: `SatisfiableDependencies`, the per-component map with
//!   start/stop deduplicated by unit name

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use adapters::service_tracker::ServiceReferenceTracker;
pub use application::dependencies::SatisfiableDependencies;
pub use domain::satisfiable::{SatisfactionListener, Satisfiable};
