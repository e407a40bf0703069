//! Algorithms over registered metadata.

pub mod metadata_walk;

pub use metadata_walk::{metadata_of_kind, MetadataNode};
