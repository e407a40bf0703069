//! Adapters layer: a static description source and the callback bridges
//! that turn host notifications into actor commands or, once created,
//! direct export updates.

pub mod bridges;
pub mod static_parser;

pub use bridges::ExportGate;
pub use static_parser::StaticDescriptionParser;
