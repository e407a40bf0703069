//! Ports layer: the description parser the container consumes.

pub mod outbound;

pub use outbound::DescriptionParser;
