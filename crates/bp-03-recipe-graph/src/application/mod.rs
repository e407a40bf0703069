//! Application layer: recipe building, the repository and service
//! registration.

pub mod builder;
pub mod repository;
pub mod service_handle;
