//! # JSON Deployment Documents
//!
//! A deployment document lists the hosted modules together with the
//! already-parsed description of each one's components:
//!
//! ```json
//! {
//!   "modules": [
//!     {
//!       "id": 1,
//!       "symbolic_name": "com.acme.app; blueprint.timeout:=10000",
//!       "version": "1.0.0",
//!       "description": { "components": [ { "type": "bean", "id": "a", "class_name": "demo.Record" } ] }
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use bp_04_lifecycle::DescriptionParser;
use shared_types::host::ModuleInfo;
use shared_types::{BlueprintDescription, ContainerError};

use crate::container::RuntimeError;

fn default_version() -> String {
    "0.0.0".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDocument {
    pub id: u64,
    /// Symbolic-name header, directives included.
    pub symbolic_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: BlueprintDescription,
}

impl ModuleDocument {
    pub fn module_info(&self) -> ModuleInfo {
        ModuleInfo::new(self.id, self.symbolic_name.clone(), self.version.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentDocument {
    #[serde(default)]
    pub modules: Vec<ModuleDocument>,
}

impl DeploymentDocument {
    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        let document: Self = serde_json::from_str(json).map_err(|e| RuntimeError::Document(e.to_string()))?;
        let mut ids = std::collections::HashSet::new();
        for module in &document.modules {
            if !ids.insert(module.id) {
                return Err(RuntimeError::Document(format!("duplicate module id {}", module.id)));
            }
        }
        Ok(document)
    }

    pub fn from_path(path: &Path) -> Result<Self, RuntimeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Identity of every module, in document order.
    pub fn modules(&self) -> Vec<ModuleInfo> {
        self.modules.iter().map(ModuleDocument::module_info).collect()
    }
}

/// Serves descriptions out of a deployment document.
#[derive(Debug, Clone)]
pub struct JsonDescriptionParser {
    document: DeploymentDocument,
}

impl JsonDescriptionParser {
    pub fn new(document: DeploymentDocument) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &DeploymentDocument {
        &self.document
    }
}

impl DescriptionParser for JsonDescriptionParser {
    fn parse(&self, module: &ModuleInfo, validate: bool) -> Result<BlueprintDescription, ContainerError> {
        let description = self
            .document
            .modules
            .iter()
            .find(|m| m.id == module.id)
            .map(|m| m.description.clone())
            .ok_or_else(|| {
                ContainerError::definition(format!(
                    "module '{}' has no blueprint description",
                    module.symbolic_name()
                ))
            })?;
        if validate {
            description.validate()?;
        }
        Ok(description)
    }
}
