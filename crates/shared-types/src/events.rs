//! # Lifecycle Events
//!
//! Notifications emitted by a container at each lifecycle transition and the
//! listener contract of the notification sink.

use crate::errors::ContainerError;
use crate::host::ModuleInfo;

/// Kind of lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerEventKind {
    Creating,
    /// Waiting on namespace handlers or external dependencies.
    GracePeriod,
    Created,
    Failure,
    Destroying,
    Destroyed,
}

impl ContainerEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creating => "CREATING",
            Self::GracePeriod => "GRACE_PERIOD",
            Self::Created => "CREATED",
            Self::Failure => "FAILURE",
            Self::Destroying => "DESTROYING",
            Self::Destroyed => "DESTROYED",
        }
    }
}

/// One lifecycle notification.
#[derive(Debug, Clone)]
pub struct ContainerEvent {
    pub kind: ContainerEventKind,
    pub module: ModuleInfo,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Missing handler or dependency filters, for grace period and failure.
    pub dependencies: Vec<String>,
    pub error: Option<ContainerError>,
    /// Set when re-delivered to a listener added after the fact.
    pub replay: bool,
}

impl ContainerEvent {
    pub fn new(kind: ContainerEventKind, module: ModuleInfo) -> Self {
        Self {
            kind,
            module,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            dependencies: Vec::new(),
            error: None,
            replay: false,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_error(mut self, error: ContainerError) -> Self {
        self.error = Some(error);
        self
    }

    /// Copy of this event flagged as a replay.
    pub fn as_replay(&self) -> Self {
        Self {
            replay: true,
            ..self.clone()
        }
    }
}

/// Receiver of lifecycle notifications.
pub trait ContainerListener: Send + Sync {
    fn container_event(&self, event: &ContainerEvent);
}
