//! Effect commands: chat lines run as effects.

use super::events::PlayerChat;
use spindle_core::{BoxError, EvalError, ParseContext, ScriptEvent, TypeKey};
use spindle_std::{context::Registries, syntax::ParseOptions};
use std::sync::Arc;
use thiserror::Error;

/// Why an effect command did nothing.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No effect matched the text.
    #[error("can't understand this effect: {0}")]
    Unparsed(String),

    /// The effect parsed but failed.
    #[error("`{effect}` failed: {source}")]
    Failed {
        /// The effect as parsed.
        effect: String,
        /// The evaluation error.
        #[source]
        source: EvalError,
    },
}

/// Runs chat lines that start with a token as effects.
///
/// A matching line is cancelled whether or not it parsed, so the token never
/// leaks into public chat. The speaker is told when a line fails.
pub struct EffectCommands {
    registries: Arc<Registries>,
    token: String,
}

impl EffectCommands {
    /// Effect commands marked by `token`.
    pub fn new(registries: Arc<Registries>, token: impl Into<String>) -> Self {
        Self {
            registries,
            token: token.into(),
        }
    }

    /// Handle one chat event; `Ok(false)` if it was not a command.
    pub fn run(&self, chat: &PlayerChat) -> Result<bool, CommandError> {
        let Some(line) = chat.message().strip_prefix(self.token.as_str()) else {
            return Ok(false);
        };
        if let Some(cancellable) = chat.as_cancellable() {
            cancellable.set_cancelled(true);
        }

        let line = line.trim();
        let options =
            ParseOptions::new(ParseContext::Command).in_event(TypeKey::of::<PlayerChat>());
        let result = match self.registries.parse_effect(line, options) {
            None => Err(CommandError::Unparsed(line.to_owned())),
            Some(effect) => {
                tracing::info!(
                    target: "spindle::script",
                    player = %chat.player().name(),
                    effect = %effect.describe(),
                    "running effect command"
                );
                effect.execute(chat).map_err(|source| CommandError::Failed {
                    effect: effect.describe(),
                    source,
                })
            }
        };

        if let Err(error) = &result {
            chat.player().send_message(&error.to_string());
        }
        result.map(|()| true)
    }

    /// [`run`](Self::run) shaped as a handler callback.
    pub fn handle(&self, chat: &PlayerChat) -> Result<(), BoxError> {
        self.run(chat).map(|_| ()).map_err(Into::into)
    }
}
