//! Description parser serving pre-parsed descriptions by module id.

use parking_lot::RwLock;
use std::collections::HashMap;

use shared_types::host::ModuleInfo;
use shared_types::{BlueprintDescription, ContainerError};

use crate::ports::outbound::DescriptionParser;

#[derive(Default)]
pub struct StaticDescriptionParser {
    descriptions: RwLock<HashMap<u64, BlueprintDescription>>,
}

impl StaticDescriptionParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, module_id: u64, description: BlueprintDescription) {
        self.descriptions.write().insert(module_id, description);
    }

    pub fn contains(&self, module_id: u64) -> bool {
        self.descriptions.read().contains_key(&module_id)
    }
}

impl DescriptionParser for StaticDescriptionParser {
    fn parse(&self, module: &ModuleInfo, validate: bool) -> Result<BlueprintDescription, ContainerError> {
        let description = self
            .descriptions
            .read()
            .get(&module.id)
            .cloned()
            .ok_or_else(|| {
                ContainerError::definition(format!("no description for module '{}'", module.symbolic_name()))
            })?;
        if validate {
            description.validate()?;
        }
        Ok(description)
    }
}
