//! Outbound Ports
//!
//! Hooks implemented by processor components declared in a description.

use crate::domain::registry::ComponentDefinitionRegistry;

/// A processor component allowed to rewrite the populated registry before
/// any ordinary component is created.
///
/// Instances are discovered at runtime: a processor bean whose instance
/// exposes this trait is run once, in declaration order.
pub trait RegistryProcessor: Send + Sync {
    fn process(&self, registry: &mut ComponentDefinitionRegistry) -> Result<(), String>;
}
