#![allow(dead_code)]

use spindle::{
    Config, Running, Startup, StartupError,
    bus::SimpleEventBus,
    host::{Entity, HostEntity, Player, Position, World},
    scheduler::ManualTicker,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use uuid::Uuid;

// ============================================================================
// Fake Host
// ============================================================================

#[derive(Debug)]
pub struct FakeEntity {
    id: Uuid,
    name: String,
    player: bool,
    position: Mutex<Position>,
    inbox: Mutex<Vec<String>>,
    teleports: AtomicUsize,
}

impl FakeEntity {
    pub fn inbox(&self) -> Vec<String> {
        self.inbox.lock().unwrap().clone()
    }

    pub fn teleports(&self) -> usize {
        self.teleports.load(Ordering::SeqCst)
    }
}

impl HostEntity for FakeEntity {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn position(&self) -> Position {
        *self.position.lock().unwrap()
    }

    fn teleport(&self, to: Position) -> bool {
        *self.position.lock().unwrap() = to;
        self.teleports.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn is_player(&self) -> bool {
        self.player
    }

    fn send_message(&self, message: &str) {
        self.inbox.lock().unwrap().push(message.to_owned());
    }
}

#[derive(Default)]
pub struct FakeWorld {
    entities: Mutex<Vec<Arc<FakeEntity>>>,
}

impl FakeWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn spawn(&self, name: &str, player: bool) -> Arc<FakeEntity> {
        let entity = Arc::new(FakeEntity {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            player,
            position: Mutex::new(Position::default()),
            inbox: Mutex::new(Vec::new()),
            teleports: AtomicUsize::new(0),
        });
        self.entities.lock().unwrap().push(entity.clone());
        entity
    }

    pub fn spawn_player(&self, name: &str) -> Arc<FakeEntity> {
        self.spawn(name, true)
    }

    pub fn spawn_entity(&self, name: &str) -> Arc<FakeEntity> {
        self.spawn(name, false)
    }
}

impl World for FakeWorld {
    fn entity(&self, id: Uuid) -> Option<Entity> {
        self.entities
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .map(|e| entity(e))
    }

    fn player_by_name(&self, name: &str) -> Option<Player> {
        self.entities
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.player && e.name.eq_ignore_ascii_case(name))
            .map(|e| player(e))
    }
}

pub fn entity(fake: &Arc<FakeEntity>) -> Entity {
    Entity::new(fake.clone() as Arc<dyn HostEntity>)
}

pub fn player(fake: &Arc<FakeEntity>) -> Player {
    Player::new(fake.clone() as Arc<dyn HostEntity>).expect("fake entity is a player")
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub world: Arc<FakeWorld>,
    pub bus: SimpleEventBus,
    pub ticker: ManualTicker,
    pub running: Running,
}

/// Start with the built-ins, then `setup`, then `scripts`.
pub fn start_with(
    config: Config,
    scripts: &[(&str, &str)],
    setup: impl FnOnce(Startup) -> Startup,
) -> Result<Harness, StartupError> {
    let world = FakeWorld::new();
    let bus = SimpleEventBus::new();
    let ticker = ManualTicker::new();

    let mut startup = setup(Startup::new(config).with_builtins(world.clone()));
    for (name, source) in scripts {
        startup = startup.with_script(*name, *source);
    }
    let running = startup.start(&bus, &ticker)?;

    Ok(Harness {
        world,
        bus,
        ticker,
        running,
    })
}

pub fn start(scripts: &[(&str, &str)]) -> Harness {
    start_with(Config::default(), scripts, |s| s).expect("startup succeeds")
}
