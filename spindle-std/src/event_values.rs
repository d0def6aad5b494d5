//! Event values: what "the player" means for a given event.
//!
//! Getters are keyed by (event key, value type). The event key may be a
//! concrete wrapper or an ancestor interface; lookups walk the dispatched
//! event's lineage and use the first getter that produces a value.

use crate::wrappers::WrapperRegistry;
use spindle_core::{ScriptEvent, TypeKey, Value};
use std::{any::Any, collections::HashMap, fmt, sync::Arc};

/// Reads one value out of an event.
pub type Getter = Arc<dyn Fn(&dyn ScriptEvent) -> Option<Value> + Send + Sync>;

/// Collects getters during registration.
#[derive(Default)]
pub struct EventValuesBuilder {
    getters: HashMap<(TypeKey, TypeKey), Getter>,
}

impl EventValuesBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a getter for `value_type` on events keyed by `event`.
    ///
    /// A later registration for the same pair replaces the earlier one.
    pub fn register(&mut self, event: TypeKey, value_type: TypeKey, getter: Getter) {
        if self.getters.insert((event, value_type), getter).is_some() {
            tracing::debug!(
                target: "spindle::syntax",
                event = %event,
                value = %value_type,
                "replaced event value getter"
            );
        }
    }

    /// Register a typed getter for `V` on concrete event `E`.
    pub fn register_for<E, V, F>(&mut self, f: F)
    where
        E: ScriptEvent,
        V: Any + Send + Sync,
        F: Fn(&E) -> Option<V> + Send + Sync + 'static,
    {
        let getter: Getter = Arc::new(move |event: &dyn ScriptEvent| {
            event.downcast_ref::<E>().and_then(&f).map(Value::new)
        });
        self.register(TypeKey::of::<E>(), TypeKey::of::<V>(), getter);
    }

    /// Freeze, resolving lineages through `wrappers`.
    pub fn build(self, wrappers: Arc<WrapperRegistry>) -> EventValues {
        EventValues {
            getters: self.getters,
            wrappers,
        }
    }
}

/// Read-only event value lookup.
pub struct EventValues {
    getters: HashMap<(TypeKey, TypeKey), Getter>,
    wrappers: Arc<WrapperRegistry>,
}

impl EventValues {
    /// The value of `value_type` for a dispatched event.
    pub fn get(&self, event: &dyn ScriptEvent, value_type: TypeKey) -> Option<Value> {
        self.wrappers
            .lineage(event.key())
            .iter()
            .filter_map(|key| self.getters.get(&(*key, value_type)))
            .find_map(|getter| getter(event))
    }

    /// Whether events keyed by `event` may provide a `value_type`.
    pub fn provides(&self, event: TypeKey, value_type: TypeKey) -> bool {
        self.wrappers
            .lineage(event)
            .iter()
            .any(|key| self.getters.contains_key(&(*key, value_type)))
    }

    /// Number of registered getters.
    pub fn len(&self) -> usize {
        self.getters.len()
    }

    /// Whether no getter is registered.
    pub fn is_empty(&self) -> bool {
        self.getters.is_empty()
    }
}

impl fmt::Debug for EventValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventValues")
            .field("getters", &self.getters.len())
            .finish()
    }
}
