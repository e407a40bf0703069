//! Domain module for the definition registry.

pub mod errors;
pub mod registry;

pub use errors::*;
pub use registry::*;
