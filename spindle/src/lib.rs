//! # spindle - Script/Event Bridge
//!
//! `spindle` lets a scripting layer with its own handlers react to events
//! produced by an independent, already-running host engine.
//!
//! The host publishes native events on its bus. The bridge wraps each one
//! in a script event, and the secondary dispatcher hands that to every
//! handler registered for the wrapper or one of its ancestor interfaces.
//! Scripts are parsed against a pattern registry into effects and
//! expressions that evaluate against the dispatched event.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spindle::{Config, Startup, bus::SimpleEventBus, scheduler::ManualTicker};
//!
//! let bus = SimpleEventBus::new();
//! let ticker = ManualTicker::new();
//! let running = Startup::new(Config::default())
//!     .with_builtins(world)
//!     .with_script("welcome", "on player join:\n    message \"Welcome!\"\n")
//!     .start(&bus, &ticker)?;
//!
//! bus.publish(PlayerSpawnEvent { player, position });
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod builtins;
pub mod config;
pub mod host;
pub mod script;
pub mod startup;

pub use config::{Config, ConfigError};
pub use startup::{Extension, Running, Startup, StartupError};

#[cfg(feature = "inventory")]
pub use startup::ExtensionRegistration;

pub use spindle_core::{
    // Errors
    BoxError,
    // Events
    CancelFlag,
    Cancellable,
    ConversionError,
    // Script values
    Effect,
    EvalError,
    EventPriority,
    EventWrapper,
    Expression,
    FieldBag,
    FieldValue,
    // Handlers
    Handler,
    HandlerError,
    HandlerMeta,
    // Native side
    NativeBus,
    NativeEvent,
    ParseContext,
    RegistrationError,
    RenderFlags,
    ScriptEvent,
    SpindleError,
    Tick,
    Ticker,
    TypeKey,
    TypedHandler,
    Value,
    script_event,
};

/// The event bridge.
pub mod bridge {
    pub use spindle_std::bridge::{Bridge, InstallReport};
}

/// In-process native bus.
pub mod bus {
    pub use spindle_std::bus::SimpleEventBus;
}

/// Registration phases and the frozen context.
pub mod context {
    pub use spindle_std::context::{BridgeContext, ContextBuilder, Registries, SealedContext};
}

/// The secondary dispatcher.
pub mod dispatch {
    pub use spindle_std::dispatch::{
        DispatchReport, Dispatcher, DispatcherBuilder, HandlerListToken,
    };
}

/// Tick scheduling.
pub mod scheduler {
    #[cfg(feature = "tokio")]
    pub use spindle_std::scheduler::IntervalTicker;
    pub use spindle_std::scheduler::{ManualTicker, ProxyTicker, Scheduler, TaskId};
}

/// Pattern registry.
pub mod syntax {
    pub use spindle_std::syntax::{
        EffectSyntax, EventMatch, ExpressionSyntax, ParseOptions, ParseResult, Pattern,
        SyntaxRegistry, SyntaxRegistryBuilder,
    };
}

/// Type conversion.
pub mod types {
    pub use spindle_std::types::{
        DefaultSource, Parser, Serializer, TypeInfo, TypeRegistry, TypeRegistryBuilder,
    };
}

/// Testing utilities.
pub mod testing {
    pub use spindle_std::testing::{CountingHandler, FailingHandler, RecordingHandler};
}

/// Prelude module - common imports for Spindle.
///
/// ```rust,ignore
/// use spindle::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Config, Effect, EvalError, EventWrapper, Expression, Extension, Handler, HandlerMeta,
        ScriptEvent, Startup, Value,
        context::ContextBuilder,
        syntax::{EffectSyntax, ExpressionSyntax, ParseResult},
    };
}

#[cfg(feature = "inventory")]
pub use inventory;
