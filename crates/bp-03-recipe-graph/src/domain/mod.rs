//! Domain module for the recipe graph.

pub mod errors;
pub mod recipe;
pub mod value;

pub use errors::*;
pub use recipe::*;
pub use value::*;
