//! Ports for dependency tracking.
//!
//! The inbound side is the host service registry (`shared_types::host`);
//! the outbound side is the `SatisfactionListener` implemented by the
//! container.

pub use crate::domain::satisfiable::{SatisfactionListener, Satisfiable};
