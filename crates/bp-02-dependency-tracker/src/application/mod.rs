//! Application layer: satisfaction aggregation.

pub mod dependencies;

pub use dependencies::SatisfiableDependencies;
