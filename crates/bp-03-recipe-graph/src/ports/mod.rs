//! Ports for the recipe graph.

pub mod outbound;

pub use outbound::*;
