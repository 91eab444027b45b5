//! Pub/Sub event bus between trackers, controllers and observers.
//!
//! - Observers subscribe to an event type; callbacks run inside `emit()`
//! - Every emitted event is also queued; the scene loop drains the queue
//!   with `poll()` and routes tracker events to controllers
//!
//! Callback order is FIFO within one event type. Nothing is promised about
//! ordering across types. Callbacks must not emit on the same bus while
//! holding locks the emitter also needs.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::warn;

/// Queue length at which the oldest half is dropped
const MAX_QUEUE_SIZE: usize = 1000;

/// Anything that can travel on the bus
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Queued event
pub type BoxedEvent = Box<dyn Event>;

/// Subscriber table and queue shared by the bus and all its emitters
#[derive(Default)]
struct Shared {
    subscribers: RwLock<HashMap<TypeId, Vec<Callback>>>,
    queue: Mutex<Vec<BoxedEvent>>,
}

impl Shared {
    fn publish(&self, type_id: TypeId, payload: &dyn Any, event: BoxedEvent) {
        // Clone the callback list so callbacks may subscribe without deadlocking
        let callbacks: Vec<Callback> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&type_id)
            .cloned()
            .unwrap_or_default();
        for cb in &callbacks {
            cb(payload);
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict = queue.len() / 2;
            warn!("Event queue full ({} events), dropping oldest {}", queue.len(), evict);
            queue.drain(0..evict);
        }
        queue.push(event);
    }
}

/// Pub/Sub bus with a deferred queue. Clones share everything.
#[derive(Clone, Default)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queue_len", &self.queue_len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` for every future event of type `E`.
    ///
    /// # Example
    /// ```ignore
    /// bus.subscribe::<SequenceReadyEvent, _>(|e| {
    ///     log::info!("{} {}: {} frames", e.target, e.kind, e.count);
    /// });
    /// ```
    pub fn subscribe<E, F>(&self, callback: F)
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let wrapped: Callback = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push(wrapped);
    }

    /// Invoke subscribers now and queue the event for `poll()`
    pub fn emit<E: Event + Clone>(&self, event: E) {
        self.emitter().emit(event);
    }

    /// Take every queued event, oldest first
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Cheap handle for code that only emits (trackers, controllers)
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Drop all subscribers of `E`
    pub fn unsubscribe_all<E: Event>(&self) {
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&TypeId::of::<E>());
    }

    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.shared
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<E>())
            .is_some_and(|v| !v.is_empty())
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Emit-only handle to an `EventBus`
#[derive(Clone)]
pub struct EventEmitter {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}

impl EventEmitter {
    pub fn emit<E: Event + Clone>(&self, event: E) {
        let payload = event.clone();
        self.shared
            .publish(TypeId::of::<E>(), &payload, Box::new(event));
    }
}

/// Optional emitter for controllers that may run without a bus
#[derive(Clone, Default, Debug)]
pub struct TargetEventEmitter {
    inner: Option<EventEmitter>,
}

impl TargetEventEmitter {
    /// No-op emitter
    pub fn dummy() -> Self {
        Self { inner: None }
    }

    pub fn from_emitter(emitter: EventEmitter) -> Self {
        Self { inner: Some(emitter) }
    }

    pub fn emit<E: Event + Clone>(&self, event: E) {
        if let Some(ref emitter) = self.inner {
            emitter.emit(event);
        }
    }
}

/// Downcast a queued event.
///
/// Derefs to `dyn Event` first: calling `as_any()` on the `Box` itself would
/// hit the blanket impl for `Box<dyn Event>` and never match.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}
