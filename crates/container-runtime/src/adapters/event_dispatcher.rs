//! # Event Dispatcher
//!
//! Fans container lifecycle events out to registered listeners and mirrors
//! them onto the shared bus.
//!
//! ```text
//!                        ┌──→ listener worker ──→ primary listeners
//! container_event() ─────┤
//!                        └──→ mirror worker ────→ EventPublisher (bus)
//! ```
//!
//! Each worker drains its own queue, so a slow bus subscriber never delays
//! listener delivery. The last event of every module is remembered and
//! replayed, flagged `replay`, to listeners added later.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use shared_bus::{BusEvent, EventPublisher};
use shared_types::{ContainerEvent, ContainerListener};

/// How long shutdown waits for the bus mirror to drain.
pub const MIRROR_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Identifies a listener added to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

enum Delivery {
    Event(ContainerEvent),
    Add(ListenerHandle, Arc<dyn ContainerListener>),
    Remove(ListenerHandle),
}

pub struct EventDispatcher {
    deliveries: Mutex<Option<UnboundedSender<Delivery>>>,
    mirror: Mutex<Option<UnboundedSender<ContainerEvent>>>,
    /// Last event seen per module id.
    states: RwLock<BTreeMap<u64, ContainerEvent>>,
    listener_worker: Mutex<Option<JoinHandle<()>>>,
    mirror_worker: Mutex<Option<JoinHandle<()>>>,
    next_listener: AtomicU64,
    /// Handles currently registered with the listener worker.
    listeners: Mutex<HashSet<ListenerHandle>>,
}

impl EventDispatcher {
    /// Spawn the workers. Without a bus only listeners are served. Must be
    /// called from within a tokio runtime.
    pub fn new(bus: Option<Arc<dyn EventPublisher>>) -> Arc<Self> {
        let (deliveries, delivery_queue) = mpsc::unbounded_channel();
        let listener_worker = tokio::spawn(deliver(delivery_queue));

        let (mirror, mirror_worker) = match bus {
            Some(bus) => {
                let (sender, queue) = mpsc::unbounded_channel();
                (Some(sender), Some(tokio::spawn(mirror_to_bus(queue, bus))))
            }
            None => (None, None),
        };

        Arc::new(Self {
            deliveries: Mutex::new(Some(deliveries)),
            mirror: Mutex::new(mirror),
            states: RwLock::new(BTreeMap::new()),
            listener_worker: Mutex::new(Some(listener_worker)),
            mirror_worker: Mutex::new(mirror_worker),
            next_listener: AtomicU64::new(1),
            listeners: Mutex::new(HashSet::new()),
        })
    }

    /// Register a listener. It first receives the last event of every
    /// module seen so far, then live events.
    pub fn add_listener(&self, listener: Arc<dyn ContainerListener>) -> ListenerHandle {
        let handle = ListenerHandle(self.next_listener.fetch_add(1, Ordering::SeqCst));
        let mut listeners = self.listeners.lock();
        if self.send(Delivery::Add(handle, listener)) {
            listeners.insert(handle);
        }
        handle
    }

    /// Returns false for a handle that is not registered.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.lock();
        if !listeners.remove(&handle) {
            return false;
        }
        self.send(Delivery::Remove(handle));
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// The last event dispatched for `module_id`.
    pub fn last_event(&self, module_id: u64) -> Option<ContainerEvent> {
        self.states.read().get(&module_id).cloned()
    }

    /// Stop accepting events, deliver what is queued, then stop the
    /// workers. The bus mirror gets [`MIRROR_DRAIN_TIMEOUT`] to catch up.
    pub async fn shutdown(&self) {
        self.deliveries.lock().take();
        self.mirror.lock().take();

        let listener_worker = self.listener_worker.lock().take();
        if let Some(worker) = listener_worker {
            if let Err(e) = worker.await {
                warn!(error = %e, "[Dispatcher] Listener worker ended abnormally");
            }
        }

        let mirror_worker = self.mirror_worker.lock().take();
        if let Some(mut worker) = mirror_worker {
            if tokio::time::timeout(MIRROR_DRAIN_TIMEOUT, &mut worker).await.is_err() {
                warn!("[Dispatcher] Bus mirror did not drain in time, abandoning");
                worker.abort();
            }
        }
        debug!("[Dispatcher] Shut down");
    }

    fn send(&self, delivery: Delivery) -> bool {
        match self.deliveries.lock().as_ref() {
            Some(sender) => sender.send(delivery).is_ok(),
            None => false,
        }
    }
}

impl ContainerListener for EventDispatcher {
    fn container_event(&self, event: &ContainerEvent) {
        debug!(
            module = %event.module.symbolic_name(),
            kind = event.kind.as_str(),
            dependencies = ?event.dependencies,
            "[Dispatcher] Dispatching container event"
        );
        self.states.write().insert(event.module.id, event.clone());
        if !self.send(Delivery::Event(event.clone())) {
            warn!(kind = event.kind.as_str(), "[Dispatcher] Event dropped after shutdown");
            return;
        }
        if let Some(mirror) = self.mirror.lock().as_ref() {
            let _ = mirror.send(event.clone());
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_count())
            .field("modules", &self.states.read().len())
            .finish()
    }
}

// =============================================================================
// Workers
// =============================================================================

async fn deliver(mut queue: UnboundedReceiver<Delivery>) {
    let mut listeners: Vec<(ListenerHandle, Arc<dyn ContainerListener>)> = Vec::new();
    // Last event delivered per module; what late listeners are replayed.
    let mut delivered: BTreeMap<u64, ContainerEvent> = BTreeMap::new();

    while let Some(delivery) = queue.recv().await {
        match delivery {
            Delivery::Event(event) => {
                for (_, listener) in &listeners {
                    notify(listener.as_ref(), &event);
                }
                delivered.insert(event.module.id, event);
            }
            Delivery::Add(handle, listener) => {
                for event in delivered.values() {
                    notify(listener.as_ref(), &event.as_replay());
                }
                listeners.push((handle, listener));
            }
            Delivery::Remove(handle) => listeners.retain(|(h, _)| *h != handle),
        }
    }
}

async fn mirror_to_bus(mut queue: UnboundedReceiver<ContainerEvent>, bus: Arc<dyn EventPublisher>) {
    while let Some(event) = queue.recv().await {
        bus.publish(BusEvent::from_container_event(&event)).await;
    }
}

/// A panicking listener must not take the worker down with it.
fn notify(listener: &dyn ContainerListener, event: &ContainerEvent) {
    if panic::catch_unwind(AssertUnwindSafe(|| listener.container_event(event))).is_err() {
        warn!(kind = event.kind.as_str(), "[Dispatcher] Listener panicked");
    }
}
