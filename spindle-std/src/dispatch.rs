//! Secondary dispatcher.
//!
//! This module provides a builder for registering handlers and a frozen
//! dispatcher for read-only, thread-safe dispatch.
//!
//! Handlers are keyed by an event key: a concrete wrapper type or any
//! ancestor interface. Dispatching an event runs every handler registered
//! for any key in the event's lineage, ordered by priority and then by
//! registration order.

use crate::wrappers::WrapperRegistry;
use spindle_core::{
    BoxError, EventWrapper, Handler, HandlerError, HandlerMeta, ScriptEvent, TypedHandler,
    TypeKey,
};
use std::{
    any::Any,
    collections::HashMap,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
};

/// Identifies the handler list of one event key.
///
/// Created on the first registration for a key and stable for the lifetime
/// of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerListToken(usize);

/// A handler with associated metadata.
struct HandlerEntry {
    key: TypeKey,
    handler: Box<dyn Handler>,
    meta: HandlerMeta,
    seq: usize,
}

// ============================================================================
// DispatcherBuilder - for registering handlers
// ============================================================================

/// Builder for constructing a [`Dispatcher`].
///
/// # Example
/// ```ignore
/// let mut builder = DispatcherBuilder::new();
/// builder.on::<PlayerJoin, _>(HandlerMeta::new("greet"), |join| { ...; Ok(()) });
/// builder.register(TypeKey::of::<PlayerEvents>(), audit, HandlerMeta::new("audit"));
/// let dispatcher = builder.build(&wrappers);
/// ```
#[derive(Default)]
pub struct DispatcherBuilder {
    entries: Vec<HandlerEntry>,
    tokens: HashMap<TypeKey, HandlerListToken>,
}

impl DispatcherBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for events keyed by `key`.
    pub fn register<H: Handler>(
        &mut self,
        key: TypeKey,
        handler: H,
        meta: HandlerMeta,
    ) -> HandlerListToken {
        let next = HandlerListToken(self.tokens.len());
        let token = *self.tokens.entry(key).or_insert(next);
        tracing::debug!(
            target: "spindle::dispatch",
            key = %key,
            handler = %meta.name,
            priority = ?meta.priority,
            "registered handler"
        );
        let seq = self.entries.len();
        self.entries.push(HandlerEntry {
            key,
            handler: Box::new(handler),
            meta,
            seq,
        });
        token
    }

    /// Register a typed handler for wrapper `W`.
    pub fn on<W, F>(&mut self, meta: HandlerMeta, f: F) -> HandlerListToken
    where
        W: EventWrapper,
        F: Fn(&W) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.register(TypeKey::of::<W>(), TypedHandler::<W, F>::new(f), meta)
    }

    /// Register a handler for interface `I`.
    pub fn on_interface<I, H>(&mut self, meta: HandlerMeta, handler: H) -> HandlerListToken
    where
        I: ?Sized + Any,
        H: Handler,
    {
        self.register(TypeKey::of::<I>(), handler, meta)
    }

    /// The token of `key`, if anything is registered for it.
    pub fn token(&self, key: TypeKey) -> Option<HandlerListToken> {
        self.tokens.get(&key).copied()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handler has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the frozen dispatcher.
    ///
    /// The handler order of every registered wrapper is resolved here, from
    /// its lineage in `wrappers`.
    pub fn build(self, wrappers: &WrapperRegistry) -> Dispatcher {
        let mut by_key: HashMap<TypeKey, Vec<usize>> = HashMap::new();
        for (index, entry) in self.entries.iter().enumerate() {
            by_key.entry(entry.key).or_default().push(index);
        }

        let resolved = wrappers
            .entries()
            .iter()
            .map(|w| {
                let lineage = wrappers.lineage(w.wrapper());
                (w.wrapper(), resolve(&self.entries, &by_key, &lineage))
            })
            .collect();

        Dispatcher {
            entries: self.entries,
            by_key,
            resolved,
            tokens: self.tokens,
        }
    }
}

fn resolve(
    entries: &[HandlerEntry],
    by_key: &HashMap<TypeKey, Vec<usize>>,
    lineage: &[TypeKey],
) -> Box<[usize]> {
    let mut indices: Vec<usize> = lineage
        .iter()
        .filter_map(|key| by_key.get(key))
        .flatten()
        .copied()
        .collect();
    indices.sort_by_key(|&i| (entries[i].meta.priority, entries[i].seq));
    indices.dedup();
    indices.into_boxed_slice()
}

// ============================================================================
// Dispatcher - read-only handler storage
// ============================================================================

/// Outcome of one dispatch.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Handlers that ran (including those that failed).
    pub invoked: usize,
    /// Handlers skipped because the event was cancelled.
    pub skipped: usize,
    /// Failures, in execution order.
    pub failures: Vec<HandlerError>,
}

impl DispatchReport {
    /// Whether every invoked handler succeeded.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A read-only, thread-safe handler table.
///
/// Created by [`DispatcherBuilder::build`].
pub struct Dispatcher {
    entries: Vec<HandlerEntry>,
    by_key: HashMap<TypeKey, Vec<usize>>,
    resolved: HashMap<TypeKey, Box<[usize]>>,
    tokens: HashMap<TypeKey, HandlerListToken>,
}

impl Dispatcher {
    /// Invoke every handler for `event` synchronously, in order.
    ///
    /// A failing or panicking handler is recorded and its siblings still run.
    pub fn dispatch(&self, event: &dyn ScriptEvent) -> DispatchReport {
        let key = event.key();
        let fallback;
        let indices: &[usize] = match self.resolved.get(&key) {
            Some(indices) => &indices[..],
            None => {
                fallback = resolve(&self.entries, &self.by_key, &[key]);
                &fallback[..]
            }
        };

        tracing::trace!(
            target: "spindle::dispatch",
            event = event.event_name(),
            handlers = indices.len(),
            "dispatching"
        );

        let mut report = DispatchReport::default();
        for &index in indices {
            let entry = &self.entries[index];
            if entry.meta.ignore_cancelled && event.is_cancelled() {
                report.skipped += 1;
                continue;
            }

            report.invoked += 1;
            let outcome = catch_unwind(AssertUnwindSafe(|| entry.handler.handle(event)));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => HandlerError::Failed {
                    name: entry.meta.name.clone(),
                    source,
                },
                Err(payload) => HandlerError::Panic {
                    name: entry.meta.name.clone(),
                    message: panic_message(payload.as_ref()),
                },
            };
            tracing::warn!(
                target: "spindle::dispatch",
                event = event.event_name(),
                error = %failure,
                "handler failed"
            );
            report.failures.push(failure);
        }
        report
    }

    /// Number of handlers that would run for events of `wrapper`.
    pub fn handler_count(&self, wrapper: TypeKey) -> usize {
        match self.resolved.get(&wrapper) {
            Some(indices) => indices.len(),
            None => self.by_key.get(&wrapper).map_or(0, Vec::len),
        }
    }

    /// The token of `key`, if anything is registered for it.
    pub fn token(&self, key: TypeKey) -> Option<HandlerListToken> {
        self.tokens.get(&key).copied()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dispatcher has no handlers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (&e.key, &e.meta)))
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{CountingHandler, FailingHandler, RecordingHandler},
        types::TypeRegistryBuilder,
        wrappers::{WrapperRegistryBuilder, WrapperSpec},
    };
    use spindle_core::{EventPriority, script_event};
    use std::sync::Arc;

    struct Said;

    script_event! {
        struct Chat(Said) cancellable;
    }

    enum Social {}

    fn wrappers() -> WrapperRegistry {
        let mut builder = WrapperRegistryBuilder::new();
        builder
            .register::<Chat>(WrapperSpec::new("chat").base::<Social>())
            .unwrap();
        builder.build(&TypeRegistryBuilder::new().build()).unwrap()
    }

    fn chat() -> Chat {
        Chat::wrap(Arc::new(Said))
    }

    #[test]
    fn priority_then_registration_order() {
        let recorder = RecordingHandler::new();
        let mut builder = DispatcherBuilder::new();
        for (name, priority) in [
            ("b", EventPriority::Normal),
            ("monitor", EventPriority::Monitor),
            ("early", EventPriority::Lowest),
            ("c", EventPriority::Normal),
        ] {
            builder.register(
                TypeKey::of::<Chat>(),
                recorder.labelled(name),
                HandlerMeta::new(name).with_priority(priority),
            );
        }
        builder.on_interface::<Social, _>(HandlerMeta::new("social"), recorder.labelled("social"));

        let report = builder.build(&wrappers()).dispatch(&chat());

        assert_eq!(report.invoked, 5);
        assert_eq!(recorder.labels(), ["early", "b", "c", "social", "monitor"]);
    }

    #[test]
    fn failures_do_not_stop_siblings() {
        let counter = CountingHandler::new();
        let mut builder = DispatcherBuilder::new();
        builder.register(
            TypeKey::of::<Chat>(),
            FailingHandler::new("nope"),
            HandlerMeta::new("failing"),
        );
        builder.register(
            TypeKey::of::<Chat>(),
            |_: &dyn ScriptEvent| -> Result<(), BoxError> { panic!("boom") },
            HandlerMeta::new("panicking"),
        );
        builder.register(TypeKey::of::<Chat>(), counter.clone(), HandlerMeta::new("count"));

        let report = builder.build(&wrappers()).dispatch(&chat());

        assert_eq!(counter.count(), 1);
        assert_eq!(report.invoked, 3);
        assert!(matches!(
            &report.failures[0],
            HandlerError::Failed { name, source } if name == "failing" && source.to_string() == "nope"
        ));
        assert!(matches!(
            &report.failures[1],
            HandlerError::Panic { message, .. } if message == "boom"
        ));
    }

    #[test]
    fn cancelled_events_skip_handlers_that_ignore_them() {
        let counter = CountingHandler::new();
        let mut builder = DispatcherBuilder::new();
        builder.on::<Chat, _>(
            HandlerMeta::new("veto").with_priority(EventPriority::Lowest),
            |chat| {
                chat.as_cancellable().unwrap().set_cancelled(true);
                Ok(())
            },
        );
        builder.register(
            TypeKey::of::<Chat>(),
            counter.clone(),
            HandlerMeta::new("skipped").ignoring_cancelled(),
        );
        builder.register(TypeKey::of::<Chat>(), counter.clone(), HandlerMeta::new("runs"));

        let report = builder.build(&wrappers()).dispatch(&chat());

        assert_eq!(report.skipped, 1);
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn tokens_are_per_key() {
        let mut builder = DispatcherBuilder::new();
        let chat_key = TypeKey::of::<Chat>();
        let first = builder.register(chat_key, CountingHandler::new(), HandlerMeta::default());
        let second = builder.register(chat_key, CountingHandler::new(), HandlerMeta::default());
        let other =
            builder.on_interface::<Social, _>(HandlerMeta::default(), CountingHandler::new());

        assert_eq!(first, second);
        assert_ne!(first, other);
        let dispatcher = builder.build(&wrappers());
        assert_eq!(dispatcher.token(TypeKey::of::<Chat>()), Some(first));
        assert_eq!(dispatcher.handler_count(TypeKey::of::<Chat>()), 3);
    }
}
