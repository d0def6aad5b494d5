//! In-process native event bus.

use spindle_core::{NativeBus, NativeCallback, NativeEvent, SharedNative, TypeKey};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

/// A synchronous [`NativeBus`] for hosts without their own, and for tests.
///
/// Callbacks run on the publishing thread, in subscription order, outside
/// the subscriber lock.
#[derive(Default)]
pub struct SimpleEventBus {
    subscribers: RwLock<HashMap<TypeKey, Vec<NativeCallback>>>,
}

impl SimpleEventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `event` to its subscribers, returning how many were called.
    pub fn publish<N: NativeEvent>(&self, event: N) -> usize {
        self.publish_shared(TypeKey::of::<N>(), Arc::new(event))
    }

    /// Publish an already shared native event.
    pub fn publish_shared(&self, event_type: TypeKey, event: SharedNative) -> usize {
        let callbacks = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event_type)
            .cloned()
            .unwrap_or_default();

        for callback in &callbacks {
            callback(&event);
        }
        callbacks.len()
    }

    /// Number of subscriptions for `event_type`.
    pub fn subscriber_count(&self, event_type: TypeKey) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event_type)
            .map_or(0, Vec::len)
    }
}

impl NativeBus for SimpleEventBus {
    fn subscribe(&self, event_type: TypeKey, callback: NativeCallback) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type)
            .or_default()
            .push(callback);
    }
}

impl fmt::Debug for SimpleEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_map()
            .entries(subscribers.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}
