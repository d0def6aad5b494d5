//! # spindle-core
//!
//! Core traits for the Spindle script/event bridge.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! host integrations and extensions that don't need the full `spindle-std`
//! implementation.
//!
//! # Layers
//!
//! Spindle connects two independently designed event models: the host
//! engine's native bus and the scripting layer's own dispatcher. The traits
//! here describe both sides of that seam.
//!
//! ## Layer 1: Native Side ([`NativeBus`], [`NativeEvent`], [`Ticker`])
//!
//! What the host engine provides. Native events are opaque, immutable
//! payloads delivered synchronously on whatever thread the host chooses.
//!
//! ## Layer 2: Wrappers ([`EventWrapper`], [`ScriptEvent`])
//!
//! A wrapper owns exactly one native event and re-exposes it to scripts.
//! Wrappers are built per delivery through a registered [`Constructor`] and
//! dropped once dispatch completes.
//!
//! ## Layer 3: Handlers ([`Handler`])
//!
//! Callbacks invoked by the secondary dispatcher, keyed by a wrapper type or
//! any of its ancestor interfaces.
//!
//! ## Layer 4: Script Values ([`Expression`], [`Effect`], [`Value`], [`FieldBag`])
//!
//! The runtime nodes produced by the pattern registry, the dynamically typed
//! values they exchange, and the field-bag persistence contract.
//!
//! # Error Types
//!
//! - [`SpindleError`] - Top-level error type
//! - [`RegistrationError`] - Fatal startup configuration errors
//! - [`ConversionError`] - Serialization and value conversion errors
//! - [`EvalError`] - Runtime evaluation errors
//! - [`HandlerError`] - Handler execution errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod bus;
mod context;
mod error;
mod event;
mod expression;
mod field_bag;
mod handler;
mod ticker;
mod value;

// Re-exports
pub use bus::{NativeBus, NativeCallback};
pub use context::{ParseContext, RenderFlags};
pub use error::{
    BoxError, ConversionError, EvalError, HandlerError, RegistrationError, SpindleError,
};
pub use event::{
    CancelFlag, Cancellable, Constructor, EventWrapper, NativeEvent, ScriptEvent, SharedNative,
    TypeKey, construct,
};
pub use expression::{Effect, Expression};
pub use field_bag::{FieldBag, FieldValue, Primitive};
pub use handler::{EventPriority, Handler, HandlerMeta, TypedHandler};
pub use ticker::{Tick, Ticker};
pub use value::Value;
