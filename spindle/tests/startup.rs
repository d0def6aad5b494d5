//! Startup sequencing, script loading and effect commands.

use spindle::{
    Config, ConfigError, Extension, HandlerMeta, RegistrationError, ScriptEvent, Startup,
    StartupError, TypeKey,
    builtins::{PlayerChat, ScriptLoad},
    bus::SimpleEventBus,
    context::ContextBuilder,
    host::{PlayerChatEvent, PlayerSpawnEvent, Position},
    scheduler::ManualTicker,
    script::ScriptErrorKind,
    testing::CountingHandler,
    types::TypeInfo,
};
use std::sync::{Arc, Mutex};

mod common;
use common::{FakeWorld, player, start, start_with};

// ============================================================================
// Scripts
// ============================================================================

const GREETER: &str = r#"    message "early"
# greet everyone who joins
on player join:
    message "Welcome!" # shown once
    fly away
on player fly:
    cancel the event
teleport everyone
    cancel the event
on chat:
"#;

#[test]
fn bad_lines_are_reported_and_the_rest_loads() {
    let harness = start(&[("greeter", GREETER)]);
    let [loaded] = harness.running.scripts() else {
        panic!("one script");
    };

    assert_eq!(loaded.name, "greeter");
    assert_eq!(loaded.triggers, 1);
    assert!(!loaded.is_clean());

    let found: Vec<_> = loaded.errors.iter().map(|e| (e.line, e.kind.clone())).collect();
    assert_eq!(
        found,
        [
            (1, ScriptErrorKind::OrphanEffect),
            (5, ScriptErrorKind::UnknownEffect("fly away".into())),
            (6, ScriptErrorKind::UnknownEvent("player fly".into())),
            (8, ScriptErrorKind::NotATrigger("teleport everyone".into())),
            (10, ScriptErrorKind::EmptyTrigger("player chat".into())),
        ]
    );
    assert_eq!(
        loaded.errors[1].to_string(),
        "greeter:5: can't understand this effect: `fly away`"
    );

    let alice = harness.world.spawn_player("Alice");
    harness.bus.publish(PlayerSpawnEvent {
        player: player(&alice),
        position: Position::default(),
    });
    assert_eq!(alice.inbox(), ["Welcome!"]);
}

#[test]
fn triggers_run_in_load_order() {
    let harness = start(&[
        ("first", "on chat:\n    message \"one\"\n"),
        ("second", "chat:\n    cancel the event\n    message \"two\"\n"),
    ]);
    assert!(harness.running.scripts().iter().all(|s| s.is_clean()));

    let alice = harness.world.spawn_player("Alice");
    harness.bus.publish(PlayerChatEvent {
        player: player(&alice),
        message: "hi".into(),
    });
    assert_eq!(alice.inbox(), ["one", "two"]);
}

#[test]
fn script_load_fires_once_after_startup() {
    let world = FakeWorld::new();
    let alice = world.spawn_player("Alice");
    let loads = CountingHandler::new();
    let observer = loads.clone();

    let startup = Startup::new(Config::default())
        .with_builtins(world.clone())
        .with_script(
            "boot",
            "on script load:\n    message \"ready\" to Alice\n    message \"unheard\"\n",
        );
    startup
        .register(move |registrar| {
            registrar.handlers().register(
                TypeKey::of::<ScriptLoad>(),
                observer,
                HandlerMeta::new("count loads"),
            );
            Ok(())
        })
        .unwrap();
    let running = startup
        .start(&SimpleEventBus::new(), &ManualTicker::new())
        .unwrap();

    assert_eq!(loads.count(), 1);
    assert_eq!(alice.inbox(), ["ready"]);
    assert!(running.scripts()[0].is_clean());
}

// ============================================================================
// Registration phase
// ============================================================================

#[test]
fn registration_closes_once_started() {
    let startup = Startup::new(Config::default()).with_builtins(FakeWorld::new());
    let bus = SimpleEventBus::new();
    let ticker = ManualTicker::new();

    assert!(!startup.is_started());
    startup.start(&bus, &ticker).unwrap();
    assert!(startup.is_started());

    assert!(matches!(
        startup.register(|_| Ok(())),
        Err(StartupError::Closed)
    ));
    assert!(matches!(
        startup.start(&bus, &ticker),
        Err(StartupError::Closed)
    ));
}

struct Duplicate;

impl Extension for Duplicate {
    fn name(&self) -> &str {
        "duplicate"
    }

    fn register(&self, registrar: &mut ContextBuilder) -> Result<(), RegistrationError> {
        registrar
            .types()
            .register(TypeInfo::builder::<f64>("number").build())
    }
}

#[test]
fn a_failing_extension_aborts_startup() {
    let result = start_with(Config::default(), &[], |s| s.with_extension(Duplicate));

    match result {
        Err(StartupError::Extension { name, source }) => {
            assert_eq!(name, "duplicate");
            assert!(matches!(source, RegistrationError::DuplicateType(_)));
        }
        other => panic!("expected an extension failure, got {:?}", other.err()),
    }
}

#[test]
fn invalid_config_is_rejected_before_registration() {
    let config = Config {
        tick_interval_ms: 0,
        ..Config::default()
    };
    let result = start_with(config, &[], |s| s);

    assert!(matches!(
        result.err(),
        Some(StartupError::Config(ConfigError::Invalid {
            field: "tick_interval_ms",
            ..
        }))
    ));
}

// ============================================================================
// Effect commands
// ============================================================================

fn with_commands(token: &str) -> (common::Harness, Arc<Mutex<Vec<bool>>>) {
    let config = Config::from_toml_str(&format!(
        "enable_effect_commands = true\neffect_command_token = \"{token}\"\n"
    ))
    .unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let harness = start_with(config, &[], |startup| {
        startup
            .register(move |registrar| {
                registrar.handlers().on::<PlayerChat, _>(
                    HandlerMeta::new("observe"),
                    move |chat| {
                        log.lock().unwrap().push(chat.is_cancelled());
                        Ok(())
                    },
                );
                Ok(())
            })
            .unwrap();
        startup
    })
    .unwrap();
    (harness, seen)
}

#[test]
fn command_lines_run_and_are_cancelled() {
    let (harness, seen) = with_commands("!");
    let alice = harness.world.spawn_player("Alice");

    harness.bus.publish(PlayerChatEvent {
        player: player(&alice),
        message: "!teleport Alice to position(1, 2, 3)".into(),
    });
    harness.bus.publish(PlayerChatEvent {
        player: player(&alice),
        message: "hello".into(),
    });

    assert_eq!(alice.teleports(), 1);
    assert_eq!(*seen.lock().unwrap(), [true, false]);
    assert!(alice.inbox().is_empty());
}

#[test]
fn unparsed_commands_are_cancelled_and_reported() {
    let (harness, seen) = with_commands("/");
    let alice = harness.world.spawn_player("Alice");

    harness.bus.publish(PlayerChatEvent {
        player: player(&alice),
        message: "/fly away".into(),
    });

    assert_eq!(*seen.lock().unwrap(), [true]);
    let inbox = alice.inbox();
    assert_eq!(inbox.len(), 1);
    assert!(inbox[0].starts_with("can't understand this effect"), "{inbox:?}");
}

#[test]
fn commands_are_off_by_default() {
    let harness = start(&[]);
    let alice = harness.world.spawn_player("Alice");

    harness.bus.publish(PlayerChatEvent {
        player: player(&alice),
        message: "!teleport Alice to position(1, 2, 3)".into(),
    });

    assert_eq!(alice.teleports(), 0);
}

// ============================================================================
// Collected extensions
// ============================================================================

#[cfg(feature = "inventory")]
mod collected {
    use super::*;
    use spindle::ExtensionRegistration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static LOADS: AtomicUsize = AtomicUsize::new(0);

    struct Marker;

    impl Extension for Marker {
        fn name(&self) -> &str {
            "marker"
        }

        fn register(&self, registrar: &mut ContextBuilder) -> Result<(), RegistrationError> {
            registrar.handlers().register(
                TypeKey::of::<ScriptLoad>(),
                |_: &dyn ScriptEvent| {
                    LOADS.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
                HandlerMeta::new("marker"),
            );
            Ok(())
        }
    }

    spindle::inventory::submit! {
        ExtensionRegistration::new("marker", || Box::new(Marker))
    }

    #[test]
    fn submitted_extensions_are_collected() {
        let harness = start_with(Config::default(), &[], |s| s.with_collected_extensions());
        assert!(harness.is_ok());
        assert_eq!(LOADS.load(Ordering::SeqCst), 1);
    }
}
