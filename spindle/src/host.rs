//! The host engine as the bridge sees it.
//!
//! The simulation engine itself lives elsewhere; these types are the narrow
//! surface the built-in types, events and effects need. A host implements
//! [`HostEntity`] for its entities and [`World`] for lookups, and publishes
//! the native events below on its bus.

use std::{fmt, sync::Arc};
use uuid::Uuid;

/// A location and facing in the world.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    /// East/west coordinate.
    pub x: f64,
    /// Height.
    pub y: f64,
    /// North/south coordinate.
    pub z: f64,
    /// Horizontal facing in degrees.
    pub yaw: f32,
    /// Vertical facing in degrees.
    pub pitch: f32,
}

impl Position {
    /// A position facing yaw 0, pitch 0.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Set the facing.
    pub fn facing(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x: {}, y: {}, z: {}, yaw: {}, pitch: {}",
            self.x, self.y, self.z, self.yaw, self.pitch
        )
    }
}

/// A live entity owned by the host.
pub trait HostEntity: Send + Sync + fmt::Debug {
    /// Stable identifier.
    fn id(&self) -> Uuid;

    /// Display name.
    fn name(&self) -> String;

    /// Current position.
    fn position(&self) -> Position;

    /// Move the entity; returns whether the host accepted the move.
    fn teleport(&self, to: Position) -> bool;

    /// Whether the entity is a connected player.
    fn is_player(&self) -> bool {
        false
    }

    /// Deliver a chat message; entities that cannot receive one ignore it.
    fn send_message(&self, message: &str) {
        let _ = message;
    }
}

/// Any entity.
#[derive(Clone)]
pub struct Entity(Arc<dyn HostEntity>);

impl Entity {
    /// Wrap a host entity.
    pub fn new(inner: Arc<dyn HostEntity>) -> Self {
        Self(inner)
    }

    /// The host entity.
    pub fn host(&self) -> &Arc<dyn HostEntity> {
        &self.0
    }

    /// Stable identifier.
    pub fn id(&self) -> Uuid {
        self.0.id()
    }

    /// Display name.
    pub fn name(&self) -> String {
        self.0.name()
    }

    /// Current position.
    pub fn position(&self) -> Position {
        self.0.position()
    }

    /// Move the entity.
    pub fn teleport(&self, to: Position) -> bool {
        self.0.teleport(to)
    }

    /// This entity as a player, if it is one.
    pub fn as_player(&self) -> Option<Player> {
        self.0.is_player().then(|| Player(self.clone()))
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Entity {}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Entity").field(&self.0).finish()
    }
}

/// A connected player.
#[derive(Clone, PartialEq, Eq)]
pub struct Player(Entity);

impl Player {
    /// Wrap a host entity that is a player.
    ///
    /// Returns `None` if the host says it is not one.
    pub fn new(inner: Arc<dyn HostEntity>) -> Option<Self> {
        Entity::new(inner).as_player()
    }

    /// The player as an entity.
    pub fn entity(&self) -> &Entity {
        &self.0
    }

    /// Stable identifier.
    pub fn id(&self) -> Uuid {
        self.0.id()
    }

    /// Player name.
    pub fn name(&self) -> String {
        self.0.name()
    }

    /// Send a chat message.
    pub fn send_message(&self, message: &str) {
        self.0.host().send_message(message);
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Player").field(self.0.host()).finish()
    }
}

/// Entity and player lookup.
pub trait World: Send + Sync {
    /// Any entity by id.
    fn entity(&self, id: Uuid) -> Option<Entity>;

    /// An online player by exact name, ignoring case.
    fn player_by_name(&self, name: &str) -> Option<Player>;

    /// An online player by id.
    fn player(&self, id: Uuid) -> Option<Player> {
        self.entity(id).and_then(|e| e.as_player())
    }
}

// ============================================================================
// Native events
// ============================================================================

/// A player entered the world.
#[derive(Debug, Clone)]
pub struct PlayerSpawnEvent {
    /// Who joined.
    pub player: Player,
    /// Where they spawned.
    pub position: Position,
}

/// A player left.
#[derive(Debug, Clone)]
pub struct PlayerDisconnectEvent {
    /// Who left.
    pub player: Player,
    /// Why, as reported by the host.
    pub reason: String,
}

/// A player sent a chat line.
#[derive(Debug, Clone)]
pub struct PlayerChatEvent {
    /// Who spoke.
    pub player: Player,
    /// What they said.
    pub message: String,
}
