//! # Runtime Configuration
//!
//! Process-wide settings of the runtime, read from the environment:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `BP_LOG_LEVEL` | log filter when `RUST_LOG` is unset | `info` |
//! | `BP_DEFAULT_TIMEOUT_MS` | dependency timeout of modules without a directive | `300000` |
//! | `BP_DESCRIPTION` | path of the deployment document | built-in demo |
//! | `BP_MIRROR_TO_BUS` | mirror lifecycle events onto the bus | `true` |
//!
//! Malformed values are logged and ignored.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use bp_04_lifecycle::ContainerConfig;

pub const LOG_LEVEL_VAR: &str = "BP_LOG_LEVEL";
pub const DEFAULT_TIMEOUT_VAR: &str = "BP_DEFAULT_TIMEOUT_MS";
pub const DESCRIPTION_VAR: &str = "BP_DESCRIPTION";
pub const MIRROR_TO_BUS_VAR: &str = "BP_MIRROR_TO_BUS";

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub log_level: String,
    /// Base configuration of every container; module directives override it.
    pub container_defaults: ContainerConfig,
    pub description: Option<PathBuf>,
    pub mirror_to_bus: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            container_defaults: ContainerConfig::default(),
            description: None,
            mirror_to_bus: true,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` yields for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup(LOG_LEVEL_VAR) {
            config.log_level = level;
        }
        if let Some(timeout) = lookup(DEFAULT_TIMEOUT_VAR) {
            match timeout.trim().parse::<u64>() {
                Ok(millis) => config.container_defaults.timeout = Duration::from_millis(millis),
                Err(_) => warn!(value = %timeout, "{DEFAULT_TIMEOUT_VAR} must be a number of milliseconds"),
            }
        }
        if let Some(path) = lookup(DESCRIPTION_VAR) {
            config.description = Some(PathBuf::from(path));
        }
        if let Some(mirror) = lookup(MIRROR_TO_BUS_VAR) {
            match mirror.trim().parse::<bool>() {
                Ok(enabled) => config.mirror_to_bus = enabled,
                Err(_) => warn!(value = %mirror, "{MIRROR_TO_BUS_VAR} must be true or false"),
            }
        }

        config
    }

    /// Short timeouts for tests.
    pub fn for_testing() -> Self {
        Self {
            log_level: "debug".to_string(),
            container_defaults: ContainerConfig::for_testing(),
            ..Self::default()
        }
    }
}
