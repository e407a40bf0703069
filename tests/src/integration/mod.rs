//! # Integration Flows
//!
//! Each file exercises one family of container behaviours through the public
//! API only: a description goes in, host registrations and lifecycle events
//! come out.

#[cfg(test)]
mod fixtures;

mod dependency_flows;
mod lifecycle_flows;
mod runtime_flows;
mod wiring_flows;
