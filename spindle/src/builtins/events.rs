//! Built-in script events and their event values.

use crate::host::{
    Entity, Player, PlayerChatEvent, PlayerDisconnectEvent, PlayerSpawnEvent, Position,
};
use spindle_core::{EventWrapper, RegistrationError, ScriptEvent, script_event};
use spindle_std::{
    event_values::EventValuesBuilder,
    wrappers::{WrapperRegistryBuilder, WrapperSpec},
};

/// Interface shared by every event about a player.
///
/// Handlers registered against it see joins, quits and chat.
pub enum PlayerEvents {}

script_event! {
    /// A player joined.
    pub struct PlayerJoin(PlayerSpawnEvent);
}

script_event! {
    /// A player left.
    pub struct PlayerQuit(PlayerDisconnectEvent);
}

script_event! {
    /// A player chatted; cancelling hides the message.
    pub struct PlayerChat(PlayerChatEvent) cancellable;
}

/// Fired once scripts are loaded and the bridge is live.
///
/// Declared only: no native event produces it.
#[derive(Debug, Default)]
pub struct ScriptLoad;

impl ScriptEvent for ScriptLoad {}

impl PlayerJoin {
    /// The joining player.
    pub fn player(&self) -> &Player {
        &self.native().player
    }
}

impl PlayerQuit {
    /// The leaving player.
    pub fn player(&self) -> &Player {
        &self.native().player
    }
}

impl PlayerChat {
    /// The speaking player.
    pub fn player(&self) -> &Player {
        &self.native().player
    }

    /// The chat line.
    pub fn message(&self) -> &str {
        &self.native().message
    }
}

pub(super) fn register(wrappers: &mut WrapperRegistryBuilder) -> Result<(), RegistrationError> {
    wrappers.register::<PlayerJoin>(
        WrapperSpec::new("player join")
            .pattern("player (join|spawn)")
            .base::<PlayerEvents>()
            .description("Called when a player enters the world."),
    )?;
    wrappers.register::<PlayerQuit>(
        WrapperSpec::new("player quit")
            .pattern("player (quit|leave|disconnect)")
            .base::<PlayerEvents>()
            .description("Called when a player leaves."),
    )?;
    wrappers.register::<PlayerChat>(
        WrapperSpec::new("player chat")
            .pattern("[player] chat")
            .base::<PlayerEvents>()
            .description("Called when a player sends a chat message. Cancellable."),
    )?;
    wrappers.declare::<ScriptLoad>(
        WrapperSpec::new("script load")
            .pattern("[script] (load|init|enable)")
            .description("Called once after every script is loaded."),
    )?;
    Ok(())
}

pub(super) fn register_values(values: &mut EventValuesBuilder) {
    values.register_for::<PlayerJoin, Player, _>(|e| Some(e.player().clone()));
    values.register_for::<PlayerJoin, Entity, _>(|e| Some(e.player().entity().clone()));
    values.register_for::<PlayerJoin, Position, _>(|e| Some(e.native().position));

    values.register_for::<PlayerQuit, Player, _>(|e| Some(e.player().clone()));
    values.register_for::<PlayerQuit, Entity, _>(|e| Some(e.player().entity().clone()));
    values.register_for::<PlayerQuit, Position, _>(|e| Some(e.player().entity().position()));

    values.register_for::<PlayerChat, Player, _>(|e| Some(e.player().clone()));
    values.register_for::<PlayerChat, Entity, _>(|e| Some(e.player().entity().clone()));
    values.register_for::<PlayerChat, Position, _>(|e| Some(e.player().entity().position()));
    values.register_for::<PlayerChat, String, _>(|e| Some(e.message().to_owned()));
}
