//! # Container State
//!
//! The single authoritative lifecycle field of a blueprint container.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a container.
///
/// ```text
/// Unknown → WaitingForHandlers → Populated → WaitingForInitialRefs
///        → InitialRefsSatisfied → WaitingForInitialRefs2 → Creating → Created
///
/// any phase ──failure/timeout──→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContainerState {
    /// Description not parsed yet.
    #[default]
    Unknown,
    /// Parsed, waiting for every referenced namespace handler.
    WaitingForHandlers,
    /// Definition registry populated.
    Populated,
    /// Recipe graph built, waiting for initial dependencies.
    WaitingForInitialRefs,
    /// Initial dependencies satisfied; converters and processors next.
    InitialRefsSatisfied,
    /// Processors ran; re-checking the (possibly rebuilt) dependency set.
    WaitingForInitialRefs2,
    /// Registering services and materialising eager singletons.
    Creating,
    /// Steady state.
    Created,
    /// Terminal failure; everything has been retracted.
    Failed,
}

impl ContainerState {
    /// Terminal states end the pass loop immediately.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Created | Self::Failed)
    }

    /// Phases in which the dependency timeout is armed.
    pub fn is_waiting_for_dependencies(self) -> bool {
        matches!(
            self,
            Self::WaitingForInitialRefs
                | Self::InitialRefsSatisfied
                | Self::WaitingForInitialRefs2
        )
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::WaitingForHandlers => "WaitingForHandlers",
            Self::Populated => "Populated",
            Self::WaitingForInitialRefs => "WaitingForInitialRefs",
            Self::InitialRefsSatisfied => "InitialRefsSatisfied",
            Self::WaitingForInitialRefs2 => "WaitingForInitialRefs2",
            Self::Creating => "Creating",
            Self::Created => "Created",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}
