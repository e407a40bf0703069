//! Application layer: the container handle and the actor behind it.

pub mod actor;
pub mod container;
pub mod context;
