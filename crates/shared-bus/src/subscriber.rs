//! # Subscriptions
//!
//! Receiving side of the bus. Each subscription owns a broadcast receiver
//! and applies its filter locally; events lost to lag are counted, never
//! replayed.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::events::{BusEvent, EventFilter, EventTopic};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// Live subscriptions per topic. A filter without topics counts as `All`.
#[derive(Debug, Default)]
pub(crate) struct SubscriberTally {
    by_topic: Mutex<HashMap<EventTopic, usize>>,
}

impl SubscriberTally {
    fn keys(filter: &EventFilter) -> Vec<EventTopic> {
        if filter.topics.is_empty() {
            vec![EventTopic::All]
        } else {
            filter.topics.clone()
        }
    }

    pub(crate) fn enroll(self: &Arc<Self>, filter: &EventFilter) -> TallySlot {
        let topics = Self::keys(filter);
        let mut counts = self.by_topic.lock();
        for topic in &topics {
            *counts.entry(*topic).or_default() += 1;
        }
        TallySlot {
            tally: Arc::clone(self),
            topics,
        }
    }

    /// Subscriptions that would see an event on `topic`.
    pub(crate) fn interested_in(&self, topic: EventTopic) -> usize {
        let counts = self.by_topic.lock();
        let all = counts.get(&EventTopic::All).copied().unwrap_or(0);
        if topic == EventTopic::All {
            return all;
        }
        all + counts.get(&topic).copied().unwrap_or(0)
    }
}

/// Releases a subscription's tally entries when dropped.
pub(crate) struct TallySlot {
    tally: Arc<SubscriberTally>,
    topics: Vec<EventTopic>,
}

impl Drop for TallySlot {
    fn drop(&mut self) {
        let mut counts = self.tally.by_topic.lock();
        for topic in &self.topics {
            if let Some(count) = counts.get_mut(topic) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    counts.remove(topic);
                }
            }
        }
    }
}

/// A filtered view of the bus. Dropping it unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<BusEvent>,
    filter: EventFilter,
    lost: u64,
    slot: TallySlot,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<BusEvent>, filter: EventFilter, slot: TallySlot) -> Self {
        Self {
            receiver,
            filter,
            lost: 0,
            slot,
        }
    }

    fn note_lag(&mut self, skipped: u64) {
        self.lost += skipped;
        warn!(skipped, total = self.lost, "[Bus] Subscriber fell behind, events lost");
    }

    /// Next matching event; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already buffered, without waiting.
    pub fn try_recv(&mut self) -> Result<Option<BusEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Events this subscription missed because it lagged.
    #[must_use]
    pub fn lost(&self) -> u64 {
        self.lost
    }

    #[must_use]
    pub fn into_stream(self) -> EventStream {
        let filter = self.filter.clone();
        let events = BroadcastStream::new(self.receiver).filter_map(move |item| match item {
            Ok(event) if filter.matches(&event) => Some(event),
            Ok(_) => None,
            Err(lagged) => {
                debug!(error = %lagged, "[Bus] Stream fell behind");
                None
            }
        });
        EventStream {
            events: Box::pin(events),
            filter: self.filter,
            _slot: self.slot,
        }
    }
}

/// `Stream` form of a subscription.
pub struct EventStream {
    events: Pin<Box<dyn Stream<Item = BusEvent> + Send>>,
    filter: EventFilter,
    _slot: TallySlot,
}

impl EventStream {
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = BusEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<BusEvent>> {
        self.events.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{EventPublisher, InMemoryEventBus};
    use shared_types::{ContainerEvent, ContainerEventKind, ModuleInfo};
    use std::time::Duration;
    use tokio::time::timeout;

    fn event(kind: ContainerEventKind, module: u64) -> BusEvent {
        BusEvent::from_container_event(&ContainerEvent::new(kind, ModuleInfo::new(module, "demo", "1.0.0")))
    }

    #[tokio::test]
    async fn test_recv_skips_other_topics() {
        let bus = InMemoryEventBus::new();
        let mut created = bus.subscribe(EventFilter::topics(vec![EventTopic::Created]));

        bus.publish(event(ContainerEventKind::Creating, 1)).await;
        bus.publish(event(ContainerEventKind::Created, 1)).await;

        let received = timeout(Duration::from_millis(100), created.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(received.topic, EventTopic::Created);
        assert_eq!(created.lost(), 0);
    }

    #[tokio::test]
    async fn test_try_recv_by_module() {
        let bus = InMemoryEventBus::new();
        let mut second = bus.subscribe(EventFilter::for_module(2));
        assert!(matches!(second.try_recv(), Ok(None)));

        bus.publish(event(ContainerEventKind::Created, 1)).await;
        bus.publish(event(ContainerEventKind::Failure, 2)).await;
        assert_eq!(second.try_recv().unwrap().unwrap().module_id, 2);
        assert!(matches!(second.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_counts_losses() {
        let bus = InMemoryEventBus::with_capacity(2);
        let mut slow = bus.subscribe(EventFilter::all());
        for _ in 0..5 {
            bus.publish(event(ContainerEventKind::GracePeriod, 1)).await;
        }

        assert!(slow.try_recv().unwrap().is_some());
        assert_eq!(slow.lost(), 3);
    }

    #[tokio::test]
    async fn test_tally_released_on_drop() {
        let bus = InMemoryEventBus::new();
        {
            let _all = bus.subscribe(EventFilter::all());
            let _failures = bus.subscribe(EventFilter::topics(vec![EventTopic::Failure]));
            assert_eq!(bus.interested_in(EventTopic::Failure), 2);
            assert_eq!(bus.interested_in(EventTopic::Created), 1);
        }
        assert_eq!(bus.interested_in(EventTopic::Failure), 0);
    }

    #[tokio::test]
    async fn test_event_stream() {
        let bus = InMemoryEventBus::new();
        let mut destroyed = bus.event_stream(EventFilter::topics(vec![EventTopic::Destroyed]));
        assert_eq!(bus.interested_in(EventTopic::Destroyed), 1);

        bus.publish(event(ContainerEventKind::Destroying, 1)).await;
        bus.publish(event(ContainerEventKind::Destroyed, 1)).await;

        let received = timeout(Duration::from_millis(100), destroyed.next())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(received.topic, EventTopic::Destroyed);
        assert_eq!(EventStream::filter(&destroyed).topics, vec![EventTopic::Destroyed]);
    }
}
