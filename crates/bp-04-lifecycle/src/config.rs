//! # Container Configuration
//!
//! Per-container options, read from directives appended to the owning
//! module's symbolic-name header:
//!
//! ```text
//! com.acme.app; blueprint.timeout:=10000; blueprint.wait-for-dependencies:=false
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use shared_types::ContainerError;

pub const TIMEOUT_DIRECTIVE: &str = "blueprint.timeout";
pub const WAIT_FOR_DEPENDENCIES_DIRECTIVE: &str = "blueprint.wait-for-dependencies";
pub const XML_VALIDATION_DIRECTIVE: &str = "blueprint.xml-validation";

/// Default wait for initial dependencies: five minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300_000);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// How long the container may wait for its initial dependencies.
    pub timeout: Duration,

    /// When false, the dependency gates never block.
    pub wait_for_dependencies: bool,

    /// Passed to the description parser.
    pub xml_validation: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            wait_for_dependencies: true,
            xml_validation: true,
        }
    }
}

impl ContainerConfig {
    /// Defaults overridden by the directives of `header`.
    pub fn from_header(header: &str) -> Result<Self, ContainerError> {
        Self::default().apply_directives(header)
    }

    /// Override fields named by the directives of `header`. Unknown
    /// directives are ignored.
    pub fn apply_directives(mut self, header: &str) -> Result<Self, ContainerError> {
        for (key, value) in directives(header) {
            match key {
                TIMEOUT_DIRECTIVE => {
                    let millis = value.parse::<u64>().map_err(|_| invalid(key, value))?;
                    self.timeout = Duration::from_millis(millis);
                }
                WAIT_FOR_DEPENDENCIES_DIRECTIVE => {
                    self.wait_for_dependencies = parse_bool(value).ok_or_else(|| invalid(key, value))?;
                }
                XML_VALIDATION_DIRECTIVE => {
                    self.xml_validation = parse_bool(value).ok_or_else(|| invalid(key, value))?;
                }
                _ => {}
            }
        }
        Ok(self)
    }

    /// Short timeouts for tests.
    pub fn for_testing() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            ..Self::default()
        }
    }
}

/// `key:=value` pairs following the first `;`.
fn directives(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').skip(1).filter_map(|clause| {
        let (key, value) = clause.split_once(":=")?;
        Some((key.trim(), value.trim().trim_matches('"')))
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn invalid(key: &str, value: &str) -> ContainerError {
    ContainerError::definition(format!("invalid value '{value}' for directive '{key}'"))
}
