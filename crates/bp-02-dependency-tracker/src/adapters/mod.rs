//! Adapters binding satisfiables to the host module system.

pub mod service_tracker;

pub use service_tracker::ServiceReferenceTracker;
