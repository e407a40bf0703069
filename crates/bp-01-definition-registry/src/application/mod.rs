//! Application layer: registry population.

pub mod populator;
