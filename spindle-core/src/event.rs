//! # Event Layer (Native Events and Wrappers)
//!
//! The host engine emits *native events*: opaque, immutable payloads that know
//! nothing about scripts. The scripting side sees *script events*: wrappers
//! that own exactly one native event and expose it through a script-facing
//! surface.
//!
//! # Identity
//!
//! Both sides are keyed by [`TypeKey`], a `TypeId` paired with the type name
//! for diagnostics. Ancestor interfaces are keyed the same way; any `'static`
//! type (including `dyn Trait` or an uninhabited marker enum) can name an
//! interface.
//!
//! # Lifecycle
//!
//! A wrapper is built per delivered native event through its
//! [`Constructor`], dispatched synchronously, then dropped. Wrappers are never
//! retained past dispatch.

use std::{
    any::{Any, TypeId},
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Runtime identity of a Rust type.
///
/// Equality and hashing use the `TypeId` only; the name is carried for logs
/// and error messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// The key of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type name without its module path.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

pub(crate) fn short_type_name(name: &'static str) -> &'static str {
    let head = name.split('<').next().unwrap_or(name);
    head.rsplit("::").next().unwrap_or(head)
}

/// A payload emitted by the host engine.
///
/// Blanket-implemented for every thread-safe `'static` type.
pub trait NativeEvent: Any + Send + Sync {}

impl<T: Any + Send + Sync> NativeEvent for T {}

/// A native event as it travels across the bus.
pub type SharedNative = Arc<dyn Any + Send + Sync>;

/// Type-erasure helper implemented for every sized script event.
#[doc(hidden)]
pub trait AsAny: Any + Send + Sync {
    /// Upcast to `Any`.
    fn as_any_ref(&self) -> &dyn Any;
    /// The key of the concrete type.
    fn erased_key(&self) -> TypeKey;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any_ref(&self) -> &dyn Any {
        self
    }

    fn erased_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }
}

/// An event as seen by scripts and the secondary dispatcher.
///
/// Most implementors are [`EventWrapper`]s produced by the bridge.
/// Script-internal events (fired by the runtime itself, never by the host)
/// implement this trait directly.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a script event",
    label = "missing `ScriptEvent` implementation",
    note = "Use `script_event!` to declare a wrapper, or implement `ScriptEvent` directly."
)]
pub trait ScriptEvent: AsAny {
    /// Human readable event name.
    fn event_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Access the cancellation state, if the event is cancellable.
    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        None
    }

    /// Whether the event has been cancelled by an earlier handler.
    fn is_cancelled(&self) -> bool {
        self.as_cancellable().is_some_and(|c| c.is_cancelled())
    }
}

impl dyn ScriptEvent {
    /// The key of the concrete event type.
    pub fn key(&self) -> TypeKey {
        self.erased_key()
    }

    /// Downcast to a concrete event type.
    pub fn downcast_ref<T: ScriptEvent>(&self) -> Option<&T> {
        self.as_any_ref().downcast_ref::<T>()
    }

    /// Whether the concrete event type is `T`.
    pub fn is<T: ScriptEvent>(&self) -> bool {
        self.as_any_ref().is::<T>()
    }
}

impl fmt::Debug for dyn ScriptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptEvent")
            .field("name", &self.event_name())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Cancellation state for events handlers may veto.
pub trait Cancellable: Send + Sync {
    /// Whether the event is cancelled.
    fn is_cancelled(&self) -> bool;

    /// Set the cancellation state.
    fn set_cancelled(&self, cancelled: bool);
}

/// Interior-mutable cancellation flag.
///
/// Handlers only ever see `&dyn ScriptEvent`, so cancellation goes through
/// an atomic.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    /// A flag that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cancellable for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set_cancelled(&self, cancelled: bool) {
        self.0.store(cancelled, Ordering::Release);
    }
}

/// A script event that owns exactly one native event.
///
/// [`EventWrapper::wrap`] is the single-argument constructor the bridge uses
/// to build a wrapper for every delivered native event.
pub trait EventWrapper: ScriptEvent + Sized {
    /// The wrapped native event type.
    type Native: NativeEvent;

    /// Build a wrapper around a delivered native event.
    fn wrap(native: Arc<Self::Native>) -> Self;

    /// The wrapped native event.
    fn native(&self) -> &Self::Native;
}

/// Type-erased wrapper constructor.
///
/// Returns `None` when handed a native event of the wrong type.
pub type Constructor = fn(SharedNative) -> Option<Box<dyn ScriptEvent>>;

/// The [`Constructor`] of wrapper `W`.
pub fn construct<W: EventWrapper>(native: SharedNative) -> Option<Box<dyn ScriptEvent>> {
    native
        .downcast::<W::Native>()
        .ok()
        .map(|native| Box::new(W::wrap(native)) as Box<dyn ScriptEvent>)
}

/// Declare an [`EventWrapper`] around a native event type.
///
/// # Example
///
/// ```rust
/// use spindle_core::{EventWrapper, script_event};
///
/// pub struct Joined {
///     pub name: String,
/// }
///
/// script_event! {
///     /// A player joined.
///     pub struct PlayerJoin(Joined);
/// }
///
/// script_event! {
///     pub struct PlayerJoinVeto(Joined) cancellable;
/// }
///
/// let event = PlayerJoin::wrap(std::sync::Arc::new(Joined { name: "ann".into() }));
/// assert_eq!(event.native().name, "ann");
/// ```
#[macro_export]
macro_rules! script_event {
    ($(#[$meta:meta])* $vis:vis struct $name:ident($native:ty);) => {
        $(#[$meta])*
        $vis struct $name {
            native: ::std::sync::Arc<$native>,
        }

        impl $crate::ScriptEvent for $name {}

        impl $crate::EventWrapper for $name {
            type Native = $native;

            fn wrap(native: ::std::sync::Arc<$native>) -> Self {
                Self { native }
            }

            fn native(&self) -> &$native {
                &self.native
            }
        }
    };
    ($(#[$meta:meta])* $vis:vis struct $name:ident($native:ty) cancellable;) => {
        $(#[$meta])*
        $vis struct $name {
            native: ::std::sync::Arc<$native>,
            cancelled: $crate::CancelFlag,
        }

        impl $crate::ScriptEvent for $name {
            fn as_cancellable(&self) -> ::std::option::Option<&dyn $crate::Cancellable> {
                ::std::option::Option::Some(&self.cancelled)
            }
        }

        impl $crate::EventWrapper for $name {
            type Native = $native;

            fn wrap(native: ::std::sync::Arc<$native>) -> Self {
                Self {
                    native,
                    cancelled: $crate::CancelFlag::new(),
                }
            }

            fn native(&self) -> &$native {
                &self.native
            }
        }
    };
}
