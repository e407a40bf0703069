//! # Publishing
//!
//! The bus fans each event out to every subscription over one broadcast
//! channel. Publishing never waits on subscribers.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::events::{BusEvent, EventFilter, EventTopic};
use crate::subscriber::{EventStream, SubscriberTally, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Sink side of the bus, as seen by the event dispatcher.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Returns how many subscriptions the event reached.
    async fn publish(&self, event: BusEvent) -> usize;

    fn events_published(&self) -> u64;
}

pub struct InMemoryEventBus {
    sender: broadcast::Sender<BusEvent>,
    tally: Arc<SubscriberTally>,
    published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` events are buffered per subscription before it lags.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            tally: Arc::default(),
            published: AtomicU64::new(0),
            capacity,
        }
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let slot = self.tally.enroll(&filter);
        debug!(topics = ?filter.topics, modules = ?filter.modules, "[Bus] Subscribed");
        Subscription::new(self.sender.subscribe(), filter, slot)
    }

    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.subscribe(filter).into_stream()
    }

    /// Open subscriptions, whatever their filter.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Open subscriptions whose topics include `topic`.
    #[must_use]
    pub fn interested_in(&self, topic: EventTopic) -> usize {
        self.tally.interested_in(topic)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("subscribers", &self.subscriber_count())
            .field("published", &self.events_published())
            .finish()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: BusEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let (topic, module) = (event.topic, event.module_id);
        let reached = self.sender.send(event).unwrap_or(0);
        if reached == 0 {
            trace!(?topic, module, "[Bus] No subscribers");
        } else {
            debug!(?topic, module, reached, "[Bus] Published");
        }
        reached
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
