//! Named-channel publish/subscribe bus for sync events.
//!
//! Observers are invoked synchronously, in registration order, on the thread
//! that emits. A panicking observer is isolated and logged; the remaining
//! observers still run. The observer list is snapshot before delivery, so an
//! observer may register, unregister, or emit reentrantly.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::error;

use siren_types::{AlertRecord, ServerEvent};

use crate::notify::Notification;

/// The named event channels delivered to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    InitialSnapshot,
    RecordCreated,
    RecordUpdated,
    RecordDeleted,
    Notify,
}

/// Payload delivered on a channel.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Wholesale replacement of the alert collection.
    InitialSnapshot(Vec<AlertRecord>),
    RecordCreated(AlertRecord),
    RecordUpdated(AlertRecord),
    RecordDeleted(i64),
    /// A derived, human-facing notification (never a wire event).
    Notify(Notification),
}

impl SyncEvent {
    pub fn channel(&self) -> Channel {
        match self {
            SyncEvent::InitialSnapshot(_) => Channel::InitialSnapshot,
            SyncEvent::RecordCreated(_) => Channel::RecordCreated,
            SyncEvent::RecordUpdated(_) => Channel::RecordUpdated,
            SyncEvent::RecordDeleted(_) => Channel::RecordDeleted,
            SyncEvent::Notify(_) => Channel::Notify,
        }
    }
}

impl From<ServerEvent> for SyncEvent {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::InitialAlerts(records) => SyncEvent::InitialSnapshot(records),
            ServerEvent::AlertCreated(record) => SyncEvent::RecordCreated(record),
            ServerEvent::AlertUpdated(record) => SyncEvent::RecordUpdated(record),
            ServerEvent::AlertDeleted { id } => SyncEvent::RecordDeleted(id),
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

/// Multi-observer event dispatcher. Cheap to clone; all clones share the
/// same registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    observers: Mutex<HashMap<Channel, Vec<(ObserverId, Observer)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                observers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register an observer on a channel. Observers fire in registration
    /// order.
    pub fn on(
        &self,
        channel: Channel,
        observer: impl Fn(&SyncEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .observers
            .lock()
            .expect("observer registry lock poisoned")
            .entry(channel)
            .or_default()
            .push((id, Arc::new(observer)));
        id
    }

    /// Unregister an observer. Returns false if it was not registered on
    /// that channel.
    pub fn off(&self, channel: Channel, id: ObserverId) -> bool {
        let mut observers = self
            .inner
            .observers
            .lock()
            .expect("observer registry lock poisoned");
        let Some(list) = observers.get_mut(&channel) else {
            return false;
        };
        let before = list.len();
        list.retain(|(oid, _)| *oid != id);
        list.len() != before
    }

    /// Deliver an event to every observer of its channel. Emitting to a
    /// channel with no observers is a no-op.
    pub fn emit(&self, event: SyncEvent) {
        let channel = event.channel();
        let snapshot: Vec<(ObserverId, Observer)> = {
            let observers = self
                .inner
                .observers
                .lock()
                .expect("observer registry lock poisoned");
            match observers.get(&channel) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        for (id, observer) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| observer(&event))).is_err() {
                error!("observer {:?} on {:?} panicked, continuing", id, channel);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
