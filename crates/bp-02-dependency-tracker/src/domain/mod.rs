//! Domain module for dependency tracking.

pub mod satisfiable;

pub use satisfiable::*;
