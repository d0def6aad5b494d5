//! # Handler Layer
//!
//! Handlers are the callbacks the secondary dispatcher invokes. They are
//! synchronous: the host delivers native events on its own thread and expects
//! dispatch to complete before its callback returns.
//!
//! # Usage Patterns
//!
//! 1. **Direct closure**: `|event: &dyn ScriptEvent| { ...; Ok(()) }`
//! 2. **Struct implementation**: `impl Handler for MyHandler`
//! 3. **Typed**: `TypedHandler::<PlayerJoin, _>::new(|join| ...)`

use crate::{error::BoxError, event::ScriptEvent};
use std::{fmt, marker::PhantomData};

/// A callback registered with the secondary dispatcher.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle script events",
    label = "missing `Handler` implementation",
    note = "Handlers must implement `handle(&self, &dyn ScriptEvent)`; closures need an explicit `&dyn ScriptEvent` parameter type."
)]
pub trait Handler: Send + Sync + 'static {
    /// Handle one dispatched event.
    fn handle(&self, event: &dyn ScriptEvent) -> Result<(), BoxError>;
}

// Blanket impl for closures
impl<F> Handler for F
where
    F: Fn(&dyn ScriptEvent) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn handle(&self, event: &dyn ScriptEvent) -> Result<(), BoxError> {
        (self)(event)
    }
}

/// A handler for one concrete event type.
///
/// Events of any other concrete type are ignored.
pub struct TypedHandler<E, F> {
    f: F,
    _phantom: PhantomData<fn(&E)>,
}

impl<E, F> TypedHandler<E, F>
where
    E: ScriptEvent,
    F: Fn(&E) -> Result<(), BoxError> + Send + Sync + 'static,
{
    /// Wrap a typed callback.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

impl<E, F> Handler for TypedHandler<E, F>
where
    E: ScriptEvent,
    F: Fn(&E) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn handle(&self, event: &dyn ScriptEvent) -> Result<(), BoxError> {
        match event.downcast_ref::<E>() {
            Some(event) => (self.f)(event),
            None => Ok(()),
        }
    }
}

/// Execution order of a handler relative to others on the same event.
///
/// Lower priorities run first; `Monitor` handlers run last and are meant to
/// observe the final outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    /// Runs first.
    Lowest,
    /// Runs before `Normal`.
    Low,
    /// The default.
    #[default]
    Normal,
    /// Runs after `Normal`.
    High,
    /// Runs after `High`.
    Highest,
    /// Runs last.
    Monitor,
}

/// Metadata for a registered handler.
#[derive(Clone)]
pub struct HandlerMeta {
    /// Name used in logs and failure reports.
    pub name: String,
    /// Execution priority.
    pub priority: EventPriority,
    /// Skip this handler once the event has been cancelled.
    pub ignore_cancelled: bool,
}

impl Default for HandlerMeta {
    fn default() -> Self {
        Self::new("handler")
    }
}

impl HandlerMeta {
    /// Create metadata with normal priority.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: EventPriority::Normal,
            ignore_cancelled: false,
        }
    }

    /// Set priority.
    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Skip this handler for cancelled events.
    pub fn ignoring_cancelled(mut self) -> Self {
        self.ignore_cancelled = true;
        self
    }
}

impl fmt::Debug for HandlerMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMeta")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("ignore_cancelled", &self.ignore_cancelled)
            .finish()
    }
}
