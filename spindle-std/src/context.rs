//! The explicit context object that replaces process-wide registries.
//!
//! # Phases
//!
//! 1. [`ContextBuilder`]: the mutable registrar. Types, wrappers, syntax,
//!    event values and handlers are registered here.
//! 2. [`SealedContext`]: produced by [`ContextBuilder::seal`]. The type,
//!    wrapper, syntax and event-value registries are frozen into
//!    [`Registries`], which can already parse scripts. Handlers can still be
//!    added, so parsed scripts can register their triggers.
//! 3. [`BridgeContext`]: produced by [`SealedContext::finish`]. Everything
//!    is read-only; the context is shared through an `Arc`.
//!
//! Each phase consumes the previous one, so late registration does not
//! compile.

use crate::{
    dispatch::{DispatchReport, Dispatcher, DispatcherBuilder},
    event_values::{EventValues, EventValuesBuilder},
    syntax::{self, EventMatch, ParseOptions, SyntaxRegistry, SyntaxRegistryBuilder},
    types::{TypeRegistry, TypeRegistryBuilder},
    wrappers::{WrapperRegistry, WrapperRegistryBuilder},
};
use spindle_core::{Effect, Expression, RegistrationError, ScriptEvent, TypeKey};
use std::{any::Any, fmt, sync::Arc};

/// The mutable registrar.
#[derive(Default)]
pub struct ContextBuilder {
    types: TypeRegistryBuilder,
    wrappers: WrapperRegistryBuilder,
    syntax: SyntaxRegistryBuilder,
    event_values: EventValuesBuilder,
    handlers: DispatcherBuilder,
}

impl ContextBuilder {
    /// Create an empty registrar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Type descriptors and converters.
    pub fn types(&mut self) -> &mut TypeRegistryBuilder {
        &mut self.types
    }

    /// Wrapper registrations.
    pub fn wrappers(&mut self) -> &mut WrapperRegistryBuilder {
        &mut self.wrappers
    }

    /// Effects and expressions.
    pub fn syntax(&mut self) -> &mut SyntaxRegistryBuilder {
        &mut self.syntax
    }

    /// Event value getters.
    pub fn event_values(&mut self) -> &mut EventValuesBuilder {
        &mut self.event_values
    }

    /// Handlers.
    pub fn handlers(&mut self) -> &mut DispatcherBuilder {
        &mut self.handlers
    }

    /// Freeze every registry except the handler table.
    pub fn seal(self) -> Result<SealedContext, RegistrationError> {
        let types = self.types.build();
        let wrappers = Arc::new(self.wrappers.build(&types)?);
        let event_values = Arc::new(self.event_values.build(Arc::clone(&wrappers)));
        let syntax = self.syntax.build(&types, &event_values)?;

        tracing::debug!(
            target: "spindle::startup",
            types = types.len(),
            wrappers = wrappers.len(),
            effects = syntax.effects().len(),
            expressions = syntax.expressions().len(),
            "registries sealed"
        );

        Ok(SealedContext {
            registries: Arc::new(Registries {
                types,
                wrappers,
                event_values,
                syntax,
            }),
            handlers: self.handlers,
        })
    }

    /// Seal and finish in one step.
    pub fn build(self) -> Result<BridgeContext, RegistrationError> {
        Ok(self.seal()?.finish())
    }
}

/// Frozen registries with an open handler table.
pub struct SealedContext {
    registries: Arc<Registries>,
    handlers: DispatcherBuilder,
}

impl SealedContext {
    /// The frozen registries.
    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    /// Handlers, still open for registration.
    pub fn handlers(&mut self) -> &mut DispatcherBuilder {
        &mut self.handlers
    }

    /// Freeze the handler table.
    pub fn finish(self) -> BridgeContext {
        let dispatcher = self.handlers.build(&self.registries.wrappers);
        tracing::debug!(
            target: "spindle::startup",
            handlers = dispatcher.len(),
            "dispatcher frozen"
        );
        BridgeContext {
            registries: self.registries,
            dispatcher,
        }
    }
}

/// The frozen type, wrapper, syntax and event-value registries.
pub struct Registries {
    types: TypeRegistry,
    wrappers: Arc<WrapperRegistry>,
    event_values: Arc<EventValues>,
    syntax: SyntaxRegistry,
}

impl Registries {
    /// Type descriptors.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Wrapper registry.
    pub fn wrappers(&self) -> &Arc<WrapperRegistry> {
        &self.wrappers
    }

    /// Event value getters.
    pub fn event_values(&self) -> &Arc<EventValues> {
        &self.event_values
    }

    /// Effect and expression entries.
    pub fn syntax(&self) -> &SyntaxRegistry {
        &self.syntax
    }

    /// Parse an effect; `None` if no entry accepts `input`.
    pub fn parse_effect(&self, input: &str, options: ParseOptions) -> Option<Box<dyn Effect>> {
        syntax::parse_effect(self, input, options)
    }

    /// Parse an expression whose values fill a slot of `return_type`.
    pub fn parse_expression(
        &self,
        input: &str,
        return_type: TypeKey,
        options: ParseOptions,
    ) -> Option<Box<dyn Expression>> {
        syntax::parse_expression(self, input, return_type, options)
    }

    /// Parse an expression of `T`.
    pub fn parse_expression_of<T: Any>(
        &self,
        input: &str,
        options: ParseOptions,
    ) -> Option<Box<dyn Expression>> {
        self.parse_expression(input, TypeKey::of::<T>(), options)
    }

    /// Parse an event pattern.
    pub fn parse_event(&self, input: &str) -> Option<EventMatch> {
        syntax::parse_event(self, input)
    }
}

impl fmt::Debug for Registries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registries")
            .field("types", &self.types.len())
            .field("wrappers", &self.wrappers.len())
            .field("syntax", &self.syntax)
            .finish()
    }
}

/// The complete, read-only context.
pub struct BridgeContext {
    registries: Arc<Registries>,
    dispatcher: Dispatcher,
}

impl BridgeContext {
    /// The frozen registries.
    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    /// The secondary dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Dispatch a script event.
    pub fn dispatch(&self, event: &dyn ScriptEvent) -> DispatchReport {
        self.dispatcher.dispatch(event)
    }
}

impl fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext")
            .field("registries", &self.registries)
            .field("handlers", &self.dispatcher.len())
            .finish()
    }
}
