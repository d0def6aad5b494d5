//! # Pattern-Based Expression/Effect Registry
//!
//! Script constructs are registered as textual grammar rules bound to a
//! factory. Parsing tries entries in registration order; the first entry
//! whose pattern matches structurally *and* whose factory accepts the bound
//! slots wins.
//!
//! # Example
//!
//! ```rust,ignore
//! builder.effect::<Teleport>(&["teleport %entities% to %position%"])?;
//!
//! impl EffectSyntax for Teleport {
//!     fn init(mut result: ParseResult) -> Option<Self> {
//!         Some(Self {
//!             targets: result.take(0)?,
//!             destination: result.take(1)?,
//!         })
//!     }
//! }
//! ```

mod exprs;
mod matcher;
mod pattern;
mod tokenizer;

pub use exprs::{ConvertedExpression, EventValueExpression, ListExpression, Literal};
pub use pattern::{Pattern, Slot};
pub use tokenizer::{Token, TokenKind, tokenize};

pub(crate) use matcher::{parse_effect, parse_event, parse_expression};

use crate::{event_values::EventValues, types::TypeRegistry};
use spindle_core::{
    Effect, Expression, ParseContext, RegistrationError, ScriptEvent, TypeKey,
};
use std::{any::Any, fmt, sync::Arc};

/// Where and for which event text is parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// The parse context.
    pub context: ParseContext,
    /// The event the parsed construct will run against, if known.
    pub event: Option<TypeKey>,
}

impl ParseOptions {
    /// Options for `context` with no ambient event.
    pub fn new(context: ParseContext) -> Self {
        Self {
            context,
            event: None,
        }
    }

    /// Set the ambient event.
    pub fn in_event(mut self, event: TypeKey) -> Self {
        self.event = Some(event);
        self
    }

    /// Script-context options for event `E`.
    pub fn for_event<E: ScriptEvent>() -> Self {
        Self::new(ParseContext::Script).in_event(TypeKey::of::<E>())
    }
}

/// What a successful structural match hands to a factory.
pub struct ParseResult {
    /// Index of the matched pattern within its entry.
    pub matched_pattern: usize,
    /// One entry per slot; `None` for unmatched slots without a default.
    pub exprs: Vec<Option<Box<dyn Expression>>>,
    /// Tags of every matched group branch.
    pub tags: Vec<String>,
    /// The matched text.
    pub text: String,
    /// The parse context.
    pub context: ParseContext,
    /// The ambient event.
    pub event: Option<TypeKey>,
}

impl ParseResult {
    /// Whether a branch tagged `tag` matched.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Take ownership of the expression bound to slot `index`.
    pub fn take(&mut self, index: usize) -> Option<Box<dyn Expression>> {
        self.exprs.get_mut(index)?.take()
    }

    /// Borrow the expression bound to slot `index`.
    pub fn expr(&self, index: usize) -> Option<&dyn Expression> {
        self.exprs.get(index)?.as_deref()
    }
}

impl fmt::Debug for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseResult")
            .field("matched_pattern", &self.matched_pattern)
            .field("exprs", &self.exprs)
            .field("tags", &self.tags)
            .field("text", &self.text)
            .finish()
    }
}

/// A matched event pattern.
#[derive(Debug)]
pub struct EventMatch {
    /// The wrapper (or declared event) type.
    pub event: TypeKey,
    /// The wrapper's registered name.
    pub name: String,
    /// Slots and tags of the match.
    pub result: ParseResult,
}

/// An effect that builds itself from a [`ParseResult`].
pub trait EffectSyntax: Effect + Sized + 'static {
    /// Initialize from the bound slots; `None` rejects the match.
    fn init(result: ParseResult) -> Option<Self>;
}

/// An expression that builds itself from a [`ParseResult`].
pub trait ExpressionSyntax: Expression + Sized + 'static {
    /// The type of the values produced.
    type Output: Any + Send + Sync;

    /// Initialize from the bound slots; `None` rejects the match.
    fn init(result: ParseResult) -> Option<Self>;
}

/// Builds an effect from a match.
pub type EffectFactory = Arc<dyn Fn(ParseResult) -> Option<Box<dyn Effect>> + Send + Sync>;

/// Builds an expression from a match.
pub type ExpressionFactory =
    Arc<dyn Fn(ParseResult) -> Option<Box<dyn Expression>> + Send + Sync>;

/// A registered effect.
pub struct EffectEntry {
    name: String,
    patterns: Vec<Pattern>,
    factory: EffectFactory,
}

impl EffectEntry {
    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiled patterns.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

/// A registered expression.
pub struct ExpressionEntry {
    name: String,
    patterns: Vec<Pattern>,
    factory: ExpressionFactory,
    return_type: TypeKey,
}

impl ExpressionEntry {
    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiled patterns.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Declared return type.
    pub fn return_type(&self) -> TypeKey {
        self.return_type
    }
}

fn compile(name: &str, patterns: &[&str]) -> Result<Vec<Pattern>, RegistrationError> {
    if patterns.is_empty() {
        return Err(RegistrationError::NoPatterns(name.to_owned()));
    }
    patterns.iter().map(|p| Pattern::compile(p)).collect()
}

/// Collects effect and expression registrations.
#[derive(Default)]
pub struct SyntaxRegistryBuilder {
    effects: Vec<EffectEntry>,
    expressions: Vec<ExpressionEntry>,
}

impl SyntaxRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register effect `E`.
    pub fn effect<E: EffectSyntax>(&mut self, patterns: &[&str]) -> Result<(), RegistrationError> {
        self.effect_fn(TypeKey::of::<E>().short_name(), patterns, |result| {
            E::init(result).map(|e| Box::new(e) as Box<dyn Effect>)
        })
    }

    /// Register an effect built by a closure.
    pub fn effect_fn<F>(
        &mut self,
        name: impl Into<String>,
        patterns: &[&str],
        factory: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(ParseResult) -> Option<Box<dyn Effect>> + Send + Sync + 'static,
    {
        let name = name.into();
        let patterns = compile(&name, patterns)?;
        tracing::debug!(target: "spindle::syntax", %name, "registered effect");
        self.effects.push(EffectEntry {
            name,
            patterns,
            factory: Arc::new(factory),
        });
        Ok(())
    }

    /// Register expression `E`.
    pub fn expression<E: ExpressionSyntax>(
        &mut self,
        patterns: &[&str],
    ) -> Result<(), RegistrationError> {
        self.expression_fn::<E::Output, _>(TypeKey::of::<E>().short_name(), patterns, |result| {
            E::init(result).map(|e| Box::new(e) as Box<dyn Expression>)
        })
    }

    /// Register an expression returning `R`, built by a closure.
    pub fn expression_fn<R, F>(
        &mut self,
        name: impl Into<String>,
        patterns: &[&str],
        factory: F,
    ) -> Result<(), RegistrationError>
    where
        R: Any + Send + Sync,
        F: Fn(ParseResult) -> Option<Box<dyn Expression>> + Send + Sync + 'static,
    {
        let name = name.into();
        let patterns = compile(&name, patterns)?;
        tracing::debug!(target: "spindle::syntax", %name, "registered expression");
        self.expressions.push(ExpressionEntry {
            name,
            patterns,
            factory: Arc::new(factory),
            return_type: TypeKey::of::<R>(),
        });
        Ok(())
    }

    /// Number of registered effects and expressions.
    pub fn len(&self) -> usize {
        self.effects.len() + self.expressions.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve slot types and freeze.
    ///
    /// Every type whose default is its event value also gets a
    /// `[the] [event-]<type>` expression, appended after the registered
    /// ones.
    pub fn build(
        mut self,
        types: &TypeRegistry,
        event_values: &Arc<EventValues>,
    ) -> Result<SyntaxRegistry, RegistrationError> {
        for info in types.iter() {
            if !matches!(info.default_source(), crate::types::DefaultSource::EventValue) {
                continue;
            }
            let key = info.key();
            let name = info.name().to_owned();
            let values = Arc::clone(event_values);
            let pattern = format!("[the] [event-]{name}");
            self.expression_fn_keyed(
                format!("event-{name}"),
                &[pattern.as_str()],
                key,
                move |result: ParseResult| {
                    let event = result.event?;
                    values.provides(event, key).then(|| {
                        Box::new(EventValueExpression::new(key, Arc::clone(&values), &name))
                            as Box<dyn Expression>
                    })
                },
            )?;
        }

        for entry in &mut self.effects {
            entry.patterns.iter_mut().try_for_each(|p| p.resolve(types))?;
        }
        for entry in &mut self.expressions {
            entry.patterns.iter_mut().try_for_each(|p| p.resolve(types))?;
        }

        Ok(SyntaxRegistry {
            effects: self.effects,
            expressions: self.expressions,
        })
    }

    fn expression_fn_keyed<F>(
        &mut self,
        name: String,
        patterns: &[&str],
        return_type: TypeKey,
        factory: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(ParseResult) -> Option<Box<dyn Expression>> + Send + Sync + 'static,
    {
        let patterns = compile(&name, patterns)?;
        self.expressions.push(ExpressionEntry {
            name,
            patterns,
            factory: Arc::new(factory),
            return_type,
        });
        Ok(())
    }
}

/// Read-only effect and expression entries.
pub struct SyntaxRegistry {
    effects: Vec<EffectEntry>,
    expressions: Vec<ExpressionEntry>,
}

impl SyntaxRegistry {
    /// Effects in registration order.
    pub fn effects(&self) -> &[EffectEntry] {
        &self.effects
    }

    /// Expressions in registration order.
    pub fn expressions(&self) -> &[ExpressionEntry] {
        &self.expressions
    }
}

impl fmt::Debug for SyntaxRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxRegistry")
            .field("effects", &self.effects.len())
            .field("expressions", &self.expressions.len())
            .finish()
    }
}
