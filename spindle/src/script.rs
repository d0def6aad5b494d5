//! Minimal script loader.
//!
//! A script is a list of triggers. Each trigger is an unindented
//! `on <event>:` header followed by indented effect lines:
//!
//! ```text
//! # greet everyone who joins
//! on player join:
//!     message "Welcome!"
//!     teleport the player to position(0, 64, 0)
//! ```
//!
//! Lines that fail to parse are reported and skipped; the rest of the script
//! still loads. Every trigger becomes one handler on its event.

use spindle_core::{
    BoxError, Effect, EvalError, Handler, HandlerMeta, ParseContext, ScriptEvent,
};
use spindle_std::{
    context::SealedContext,
    syntax::{EventMatch, ParseOptions},
};
use std::{fmt, sync::Arc};
use thiserror::Error;

/// What went wrong on one script line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptErrorKind {
    /// The header names no registered event.
    #[error("can't understand this event: `{0}`")]
    UnknownEvent(String),

    /// No effect matches the line.
    #[error("can't understand this effect: `{0}`")]
    UnknownEffect(String),

    /// An unindented line that is not a trigger header.
    #[error("expected `on <event>:`, found `{0}`")]
    NotATrigger(String),

    /// An indented line before any trigger header.
    #[error("effect outside of a trigger")]
    OrphanEffect,

    /// A trigger header with no effect lines under it.
    #[error("trigger `on {0}` has no effects")]
    EmptyTrigger(String),
}

/// A failing script line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{script}:{line}: {kind}")]
pub struct ScriptError {
    /// Script name.
    pub script: String,
    /// One-based line number.
    pub line: usize,
    /// What went wrong.
    pub kind: ScriptErrorKind,
}

/// Outcome of loading one script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedScript {
    /// Script name.
    pub name: String,
    /// Triggers registered as handlers.
    pub triggers: usize,
    /// Lines that were skipped.
    pub errors: Vec<ScriptError>,
}

impl LoadedScript {
    /// Whether every line loaded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Effects of one trigger failed.
#[derive(Debug, Error)]
#[error("{} effect(s) failed in {trigger}", .errors.len())]
pub struct TriggerError {
    /// The trigger's handler name.
    pub trigger: String,
    /// One entry per failed effect, in order.
    pub errors: Vec<EvalError>,
}

/// A parsed trigger: the effects to run when its event fires.
pub struct Trigger {
    name: String,
    effects: Vec<Box<dyn Effect>>,
}

impl Trigger {
    /// Handler name, `<script>: on <event>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The effects, in script order.
    pub fn effects(&self) -> &[Box<dyn Effect>] {
        &self.effects
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("effects", &self.effects.len())
            .finish()
    }
}

impl Handler for Trigger {
    /// Runs every effect; a failing effect does not stop the ones after it.
    fn handle(&self, event: &dyn ScriptEvent) -> Result<(), BoxError> {
        let mut errors = Vec::new();
        for effect in &self.effects {
            if let Err(error) = effect.execute(event) {
                tracing::warn!(
                    target: "spindle::script",
                    trigger = %self.name,
                    effect = %effect.describe(),
                    %error,
                    "effect failed"
                );
                errors.push(error);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Box::new(TriggerError {
                trigger: self.name.clone(),
                errors,
            }))
        }
    }
}

struct Pending {
    header: EventMatch,
    line: usize,
    effects: Vec<Box<dyn Effect>>,
}

enum Block {
    Outside,
    // Under a header that failed; its body is skipped silently.
    Skipping,
    Trigger(Pending),
}

/// Parse `source` and register its triggers on `context`.
pub fn load_script(context: &mut SealedContext, name: &str, source: &str) -> LoadedScript {
    let registries = Arc::clone(context.registries());
    let mut loaded = LoadedScript {
        name: name.to_owned(),
        ..LoadedScript::default()
    };
    let mut block = Block::Outside;

    let error = |loaded: &mut LoadedScript, line: usize, kind: ScriptErrorKind| {
        let error = ScriptError {
            script: name.to_owned(),
            line,
            kind,
        };
        tracing::warn!(target: "spindle::script", %error, "skipped script line");
        loaded.errors.push(error);
    };

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let content = strip_comment(raw);
        let text = content.trim();
        if text.is_empty() {
            continue;
        }

        if content.starts_with(char::is_whitespace) {
            match &mut block {
                Block::Outside => error(&mut loaded, line, ScriptErrorKind::OrphanEffect),
                Block::Skipping => {}
                Block::Trigger(pending) => {
                    let options = ParseOptions::new(ParseContext::Script)
                        .in_event(pending.header.event);
                    match registries.parse_effect(text, options) {
                        Some(effect) => pending.effects.push(effect),
                        None => error(
                            &mut loaded,
                            line,
                            ScriptErrorKind::UnknownEffect(text.to_owned()),
                        ),
                    }
                }
            }
            continue;
        }

        if let Block::Trigger(pending) = std::mem::replace(&mut block, Block::Outside) {
            finish(context, &mut loaded, pending, &error);
        }

        let Some(header) = text.strip_suffix(':') else {
            error(&mut loaded, line, ScriptErrorKind::NotATrigger(text.to_owned()));
            block = Block::Skipping;
            continue;
        };
        let event = strip_on(header.trim());
        block = match registries.parse_event(event) {
            Some(header) => Block::Trigger(Pending {
                header,
                line,
                effects: Vec::new(),
            }),
            None => {
                error(&mut loaded, line, ScriptErrorKind::UnknownEvent(event.to_owned()));
                Block::Skipping
            }
        };
    }

    if let Block::Trigger(pending) = block {
        finish(context, &mut loaded, pending, &error);
    }

    tracing::info!(
        target: "spindle::script",
        script = name,
        triggers = loaded.triggers,
        errors = loaded.errors.len(),
        "loaded script"
    );
    loaded
}

fn finish(
    context: &mut SealedContext,
    loaded: &mut LoadedScript,
    pending: Pending,
    error: &impl Fn(&mut LoadedScript, usize, ScriptErrorKind),
) {
    let event_name = pending.header.name;
    if pending.effects.is_empty() {
        error(loaded, pending.line, ScriptErrorKind::EmptyTrigger(event_name));
        return;
    }

    let trigger = Trigger {
        name: format!("{}: on {}", loaded.name, event_name),
        effects: pending.effects,
    };
    tracing::debug!(
        target: "spindle::script",
        trigger = %trigger.name,
        effects = trigger.effects.len(),
        "registered trigger"
    );
    let meta = HandlerMeta::new(trigger.name.clone());
    context.handlers().register(pending.header.event, trigger, meta);
    loaded.triggers += 1;
}

fn strip_on(header: &str) -> &str {
    match header.split_once(char::is_whitespace) {
        Some((on, rest)) if on.eq_ignore_ascii_case("on") => rest.trim_start(),
        _ => header,
    }
}

/// Cut a trailing `#` comment that is not inside a quoted string.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}
