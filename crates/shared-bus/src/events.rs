//! # Bus Events
//!
//! The pub/sub form of a container lifecycle notification: a topic plus a
//! flat property map, the shape generic event consumers expect.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use shared_types::{ContainerEvent, ContainerEventKind};
use uuid::Uuid;

/// Topic prefix shared by every container lifecycle topic.
pub const TOPIC_PREFIX: &str = "org/osgi/service/blueprint/container";

/// Property keys attached to every mirrored event.
pub mod keys {
    pub const TYPE: &str = "type";
    pub const EVENT: &str = "event";
    pub const TIMESTAMP: &str = "timestamp";
    pub const BUNDLE_ID: &str = "bundle.id";
    pub const BUNDLE_SYMBOLICNAME: &str = "bundle.symbolicName";
    pub const BUNDLE_VERSION: &str = "bundle.version";
    pub const DEPENDENCIES: &str = "dependencies";
    pub const EXCEPTION: &str = "exception";
    pub const REPLAY: &str = "replay";
}

/// One topic per lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Creating,
    GracePeriod,
    Created,
    Failure,
    Destroying,
    Destroyed,
    /// Matches every topic in a filter.
    All,
}

impl EventTopic {
    /// Full topic path.
    pub fn path(self) -> String {
        let leaf = match self {
            Self::Creating => "CREATING",
            Self::GracePeriod => "GRACE_PERIOD",
            Self::Created => "CREATED",
            Self::Failure => "FAILURE",
            Self::Destroying => "DESTROYING",
            Self::Destroyed => "DESTROYED",
            Self::All => "*",
        };
        format!("{TOPIC_PREFIX}/{leaf}")
    }
}

impl From<ContainerEventKind> for EventTopic {
    fn from(kind: ContainerEventKind) -> Self {
        match kind {
            ContainerEventKind::Creating => Self::Creating,
            ContainerEventKind::GracePeriod => Self::GracePeriod,
            ContainerEventKind::Created => Self::Created,
            ContainerEventKind::Failure => Self::Failure,
            ContainerEventKind::Destroying => Self::Destroying,
            ContainerEventKind::Destroyed => Self::Destroyed,
        }
    }
}

/// A lifecycle event as published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    pub event_id: Uuid,
    pub topic: EventTopic,
    pub module_id: u64,
    pub properties: Map<String, Value>,
}

impl BusEvent {
    /// Flatten a container event into topic and properties.
    pub fn from_container_event(event: &ContainerEvent) -> Self {
        let mut properties = Map::new();
        properties.insert(keys::TYPE.into(), json!(event.kind.as_str()));
        properties.insert(keys::TIMESTAMP.into(), json!(event.timestamp_ms));
        properties.insert(keys::BUNDLE_ID.into(), json!(event.module.id));
        properties.insert(
            keys::BUNDLE_SYMBOLICNAME.into(),
            json!(event.module.symbolic_name()),
        );
        properties.insert(keys::BUNDLE_VERSION.into(), json!(event.module.version));
        properties.insert(keys::REPLAY.into(), json!(event.replay));
        if !event.dependencies.is_empty() {
            properties.insert(keys::DEPENDENCIES.into(), json!(event.dependencies));
        }
        if let Some(error) = &event.error {
            properties.insert(keys::EXCEPTION.into(), json!(error.to_string()));
        }

        Self {
            event_id: Uuid::new_v4(),
            topic: event.kind.into(),
            module_id: event.module.id,
            properties,
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Modules to include. Empty means every module.
    pub modules: Vec<u64>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            modules: Vec::new(),
        }
    }

    #[must_use]
    pub fn for_module(module_id: u64) -> Self {
        Self {
            topics: Vec::new(),
            modules: vec![module_id],
        }
    }

    #[must_use]
    pub fn matches(&self, event: &BusEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic);
        let module_match = self.modules.is_empty() || self.modules.contains(&event.module_id);
        topic_match && module_match
    }
}
