//! # Shared Bus
//!
//! Pub/sub bus onto which container lifecycle notifications are mirrored.
//! It is a best-effort secondary sink: publishing never blocks, and a
//! subscriber that falls behind loses events rather than holding up the
//! dispatcher.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe()  ┌────────────┐
//! │  Dispatcher  │ ────────────→ │  Event Bus   │ ────────────→ │ Consumers  │
//! └──────────────┘               └──────────────┘               └────────────┘
//! ```
//!
//! Topics follow the `org/osgi/service/blueprint/container/<KIND>` layout,
//! and event properties use the keys in [`events::keys`].

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{keys, BusEvent, EventFilter, EventTopic, TOPIC_PREFIX};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Events buffered per subscription before it starts to lag.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
