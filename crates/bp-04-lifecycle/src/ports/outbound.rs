//! Outbound Ports

use shared_types::host::ModuleInfo;
use shared_types::{BlueprintDescription, ContainerError};

/// Produces the parsed description of a module's components.
pub trait DescriptionParser: Send + Sync {
    /// `validate` requests strict checking of the description.
    fn parse(&self, module: &ModuleInfo, validate: bool) -> Result<BlueprintDescription, ContainerError>;
}
