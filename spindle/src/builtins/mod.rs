//! The built-in extension.
//!
//! Registers the host-facing types, events, event values, expressions and
//! effects every script can use:
//!
//! | Kind        | Entries                                                        |
//! |-------------|----------------------------------------------------------------|
//! | types       | `number`, `string`, `boolean`, `entity`, `player`, `position`  |
//! | events      | player join, player quit, player chat, script load             |
//! | expressions | `position(x, y, z)`, `the position of %entities%`, `the message` |
//! | effects     | `teleport`, `message`, `cancel the event`                      |

mod commands;
mod effects;
mod events;
mod expressions;
mod types;

pub use commands::{CommandError, EffectCommands};
pub use effects::{Message, SetCancelled, Teleport};
pub use events::{PlayerChat, PlayerEvents, PlayerJoin, PlayerQuit, ScriptLoad};
pub use expressions::{ChatMessage, PositionLiteral, PositionOf};

use crate::{config::Config, host::World, startup::Extension};
use spindle_core::{EventPriority, HandlerMeta, RegistrationError};
use spindle_std::context::{ContextBuilder, SealedContext};
use std::sync::Arc;

/// Registers the built-in syntax against a host [`World`].
pub struct Builtins {
    world: Arc<dyn World>,
    entity_names_in_scripts: bool,
    effect_command_token: Option<String>,
}

impl Builtins {
    /// Built-ins with effect commands off.
    pub fn new(world: Arc<dyn World>) -> Self {
        Self {
            world,
            entity_names_in_scripts: false,
            effect_command_token: None,
        }
    }

    /// Built-ins set up from `config`.
    pub fn from_config(world: Arc<dyn World>, config: &Config) -> Self {
        let builtins = Self::new(world).entity_names_in_scripts(config.entity_names_in_scripts);
        if config.enable_effect_commands {
            builtins.effect_commands(config.effect_command_token.clone())
        } else {
            builtins
        }
    }

    /// Whether entity names and UUIDs parse inside scripts.
    pub fn entity_names_in_scripts(mut self, enabled: bool) -> Self {
        self.entity_names_in_scripts = enabled;
        self
    }

    /// Run chat lines starting with `token` as effects.
    pub fn effect_commands(mut self, token: impl Into<String>) -> Self {
        self.effect_command_token = Some(token.into());
        self
    }
}

impl Extension for Builtins {
    fn name(&self) -> &str {
        "builtins"
    }

    fn register(&self, registrar: &mut ContextBuilder) -> Result<(), RegistrationError> {
        types::register(registrar.types(), &self.world, self.entity_names_in_scripts)?;
        events::register(registrar.wrappers())?;
        events::register_values(registrar.event_values());
        expressions::register(registrar.syntax())?;
        effects::register(registrar.syntax())?;
        Ok(())
    }

    fn sealed(&self, context: &mut SealedContext) -> Result<(), RegistrationError> {
        let Some(token) = &self.effect_command_token else {
            return Ok(());
        };
        let commands = EffectCommands::new(Arc::clone(context.registries()), token.clone());
        // First, so later handlers already see the chat line cancelled.
        context.handlers().on::<PlayerChat, _>(
            HandlerMeta::new("effect commands").with_priority(EventPriority::Lowest),
            move |chat| commands.handle(chat),
        );
        Ok(())
    }
}
