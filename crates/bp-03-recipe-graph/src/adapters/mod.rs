//! Adapters: factories, converters and reference proxies.

pub mod converters;
pub mod factories;
pub mod proxies;
