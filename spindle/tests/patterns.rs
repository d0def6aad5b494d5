//! Pattern registry behaviour through the built-in syntax.

use spindle::{
    Config, Effect, EvalError, EventWrapper, Expression, ParseContext, ScriptEvent, TypeKey,
    Value,
    builtins::{PlayerChat, PlayerJoin, ScriptLoad},
    host::{Entity, Player, PlayerChatEvent, PlayerSpawnEvent, Position},
    syntax::ParseOptions,
};
use std::sync::{Arc, Mutex};

mod common;
use common::{FakeEntity, Harness, player, start, start_with};

fn command() -> ParseOptions {
    ParseOptions::new(ParseContext::Command)
}

fn chat(harness: &Harness, name: &str, message: &str) -> (Arc<FakeEntity>, PlayerChat) {
    let speaker = harness.world.spawn_player(name);
    let event = PlayerChat::wrap(Arc::new(PlayerChatEvent {
        player: player(&speaker),
        message: message.to_owned(),
    }));
    (speaker, event)
}

#[derive(Debug)]
struct Mark {
    label: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Effect for Mark {
    fn execute(&self, _event: &dyn ScriptEvent) -> Result<(), EvalError> {
        self.log.lock().unwrap().push(self.label);
        Ok(())
    }
}

#[derive(Debug)]
struct Fixed {
    key: TypeKey,
    values: Vec<Value>,
}

impl Expression for Fixed {
    fn return_type(&self) -> TypeKey {
        self.key
    }

    fn is_single(&self) -> bool {
        self.values.len() <= 1
    }

    fn get_all(&self, _event: &dyn ScriptEvent) -> Result<Vec<Value>, EvalError> {
        Ok(self.values.clone())
    }
}

// ============================================================================
// Teleport and lists
// ============================================================================

#[test]
fn command_teleports_a_named_player() {
    let harness = start(&[]);
    let alice = harness.world.spawn_player("Alice");

    let effect = harness
        .running
        .registries()
        .parse_effect("teleport Alice to position(0, 64, 0, yaw=0, pitch=0)", command())
        .expect("teleport parses");
    effect.execute(&ScriptLoad).unwrap();

    assert_eq!(alice.teleports(), 1);
    assert_eq!(common::entity(&alice).position(), Position::new(0.0, 64.0, 0.0));
}

#[test]
fn lists_split_on_commas_and_and() {
    let harness = start(&[]);
    let alice = harness.world.spawn_player("Alice");
    let bob = harness.world.spawn_player("Bob");
    let carol = harness.world.spawn_player("Carol");

    let effect = harness
        .running
        .registries()
        .parse_effect(
            "teleport Alice, Bob and Carol to position(1, 2, 3, yaw=90)",
            command(),
        )
        .expect("list parses");
    effect.execute(&ScriptLoad).unwrap();

    let expected = Position::new(1.0, 2.0, 3.0).facing(90.0, 0.0);
    for fake in [&alice, &bob, &carol] {
        assert_eq!(fake.teleports(), 1);
        assert_eq!(common::entity(fake).position(), expected);
    }
}

#[test]
fn entity_names_need_opting_in_for_scripts() {
    let line = "teleport Alice to position(0, 0, 0)";

    let harness = start(&[]);
    harness.world.spawn_player("Alice");
    let script = ParseOptions::new(ParseContext::Script);
    assert!(harness.running.registries().parse_effect(line, script).is_none());

    let config = Config {
        entity_names_in_scripts: true,
        ..Config::default()
    };
    let harness = start_with(config, &[], |s| s).unwrap();
    harness.world.spawn_player("Alice");
    assert!(harness.running.registries().parse_effect(line, script).is_some());
}

#[test]
fn positions_have_no_literal_form() {
    let harness = start(&[]);
    let registries = harness.running.registries();

    assert!(
        registries
            .parse_expression_of::<Position>("1, 2, 3", ParseOptions::new(ParseContext::Parse))
            .is_none()
    );
    assert!(
        registries
            .parse_expression_of::<Position>("position(1, 2, 3)", command())
            .is_some()
    );
}

// ============================================================================
// Entry order
// ============================================================================

#[test]
fn first_registered_matching_entry_wins() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (first, second) = (log.clone(), log.clone());
    let harness = start_with(Config::default(), &[], |startup| {
        startup
            .register(move |registrar| {
                registrar.syntax().effect_fn("first", &["shout %string%"], move |_| {
                    Some(Box::new(Mark {
                        label: "first",
                        log: first.clone(),
                    }) as Box<dyn Effect>)
                })?;
                registrar.syntax().effect_fn("second", &["shout %string%"], move |_| {
                    Some(Box::new(Mark {
                        label: "second",
                        log: second.clone(),
                    }) as Box<dyn Effect>)
                })
            })
            .unwrap();
        startup
    })
    .unwrap();

    let effect = harness
        .running
        .registries()
        .parse_effect(r#"shout "hi""#, ParseOptions::default())
        .unwrap();
    effect.execute(&ScriptLoad).unwrap();

    assert_eq!(*log.lock().unwrap(), ["first"]);
}

#[test]
fn a_rejecting_factory_falls_through_to_the_next_entry() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let fallback = log.clone();
    let harness = start_with(Config::default(), &[], |startup| {
        startup
            .register(move |registrar| {
                registrar
                    .syntax()
                    .effect_fn("picky", &["shout %string%"], |_| None)?;
                registrar.syntax().effect_fn("fallback", &["shout %string%"], move |_| {
                    Some(Box::new(Mark {
                        label: "fallback",
                        log: fallback.clone(),
                    }) as Box<dyn Effect>)
                })
            })
            .unwrap();
        startup
    })
    .unwrap();

    let effect = harness
        .running
        .registries()
        .parse_effect(r#"shout "hi""#, ParseOptions::default())
        .unwrap();
    effect.execute(&ScriptLoad).unwrap();

    assert_eq!(*log.lock().unwrap(), ["fallback"]);
}

// ============================================================================
// Plurality
// ============================================================================

fn with_fixed_expressions() -> Harness {
    start_with(Config::default(), &[], |startup| {
        startup
            .register(|registrar| {
                registrar
                    .syntax()
                    .expression_fn::<Entity, _>("nobody", &["nobody"], |_| {
                        Some(Box::new(Fixed {
                            key: TypeKey::of::<Entity>(),
                            values: Vec::new(),
                        }) as Box<dyn Expression>)
                    })?;
                registrar
                    .syntax()
                    .expression_fn::<f64, _>("pair", &["both numbers"], |_| {
                        Some(Box::new(Fixed {
                            key: TypeKey::of::<f64>(),
                            values: vec![Value::new(1.0f64), Value::new(2.0f64)],
                        }) as Box<dyn Expression>)
                    })
            })
            .unwrap();
        startup
    })
    .unwrap()
}

#[test]
fn an_empty_plural_is_not_an_error() {
    let harness = with_fixed_expressions();
    let effect = harness
        .running
        .registries()
        .parse_effect("teleport nobody to position(1, 2, 3)", ParseOptions::default())
        .unwrap();

    assert_eq!(effect.execute(&ScriptLoad), Ok(()));
}

#[test]
fn a_singular_slot_rejects_several_values_at_evaluation() {
    let harness = with_fixed_expressions();
    let effect = harness
        .running
        .registries()
        .parse_effect(
            "teleport nobody to position(both numbers, 0, 0)",
            ParseOptions::default(),
        )
        .expect("plurality is checked when evaluating");

    assert!(matches!(
        effect.execute(&ScriptLoad),
        Err(EvalError::NotSingle { count: 2, .. })
    ));
}

// ============================================================================
// Defaults, tags and event values
// ============================================================================

#[test]
fn the_player_reads_the_ambient_event() {
    let harness = start(&[]);
    let registries = harness.running.registries();
    let (_, event) = chat(&harness, "Alice", "hi");

    for text in ["the player", "player", "event-player", "the event-player"] {
        let expr = registries
            .parse_expression_of::<Player>(text, ParseOptions::for_event::<PlayerChat>())
            .unwrap_or_else(|| panic!("`{text}` parses"));
        let found: Player = expr.require(&event).unwrap();
        assert_eq!(found.name(), "Alice");
    }

    assert!(
        registries
            .parse_expression_of::<Player>("the player", ParseOptions::for_event::<ScriptLoad>())
            .is_none()
    );
}

#[test]
fn players_fill_entity_slots_through_the_converter() {
    let harness = start(&[]);
    let alice = harness.world.spawn_player("Alice");
    let event = PlayerJoin::wrap(Arc::new(PlayerSpawnEvent {
        player: player(&alice),
        position: Position::default(),
    }));

    let effect = harness
        .running
        .registries()
        .parse_effect(
            "teleport the player to position(5, 6, 7)",
            ParseOptions::for_event::<PlayerJoin>(),
        )
        .unwrap();
    effect.execute(&event).unwrap();

    assert_eq!(common::entity(&alice).position(), Position::new(5.0, 6.0, 7.0));
}

#[test]
fn messages_default_to_the_event_player() {
    let harness = start(&[]);
    let bob = harness.world.spawn_player("Bob");
    let (alice, event) = chat(&harness, "Alice", "hi");

    let effect = harness
        .running
        .registries()
        .parse_effect(r#"message "welcome""#, ParseOptions::for_event::<PlayerChat>())
        .unwrap();
    effect.execute(&event).unwrap();

    assert_eq!(alice.inbox(), ["welcome"]);
    assert!(bob.inbox().is_empty());
}

#[test]
fn messages_without_a_player_reach_nobody() {
    let harness = start(&[]);
    let alice = harness.world.spawn_player("Alice");
    let bob = harness.world.spawn_player("Bob");

    let effect = harness
        .running
        .registries()
        .parse_effect(r#"send "restarting""#, ParseOptions::for_event::<ScriptLoad>())
        .unwrap();
    assert_eq!(effect.execute(&ScriptLoad), Ok(()));

    assert!(alice.inbox().is_empty());
    assert!(bob.inbox().is_empty());
}

#[test]
fn explicit_recipients_and_the_chat_message() {
    let harness = start(&[]);
    let bob = harness.world.spawn_player("Bob");
    let (alice, event) = chat(&harness, "Alice", "psst");

    let effect = harness
        .running
        .registries()
        .parse_effect(
            "message the message to Bob",
            ParseOptions::for_event::<PlayerChat>(),
        )
        .unwrap();
    effect.execute(&event).unwrap();

    assert_eq!(bob.inbox(), ["psst"]);
    assert!(alice.inbox().is_empty());
}

#[test]
fn the_chat_message_only_exists_in_chat() {
    let harness = start(&[]);
    let registries = harness.running.registries();

    assert!(
        registries
            .parse_expression_of::<String>("the message", ParseOptions::for_event::<PlayerJoin>())
            .is_none()
    );
    assert!(
        registries
            .parse_expression_of::<String>("the message", ParseOptions::for_event::<PlayerChat>())
            .is_some()
    );
}

#[test]
fn tags_select_cancel_or_uncancel() {
    let harness = start(&[]);
    let registries = harness.running.registries();
    let (_, event) = chat(&harness, "Alice", "hi");
    let options = ParseOptions::for_event::<PlayerChat>();

    let cancel = registries.parse_effect("cancel the event", options).unwrap();
    let uncancel = registries.parse_effect("uncancel event", options).unwrap();

    cancel.execute(&event).unwrap();
    assert!(event.is_cancelled());
    uncancel.execute(&event).unwrap();
    assert!(!event.is_cancelled());

    assert!(matches!(
        cancel.execute(&ScriptLoad),
        Err(EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn event_patterns_resolve_to_wrappers() {
    let harness = start(&[]);
    let registries = harness.running.registries();

    let cases = [
        ("player join", TypeKey::of::<PlayerJoin>()),
        ("Player Spawn", TypeKey::of::<PlayerJoin>()),
        ("chat", TypeKey::of::<PlayerChat>()),
        ("script load", TypeKey::of::<ScriptLoad>()),
    ];
    for (text, expected) in cases {
        let matched = registries
            .parse_event(text)
            .unwrap_or_else(|| panic!("`{text}` is an event"));
        assert_eq!(matched.event, expected, "{text}");
    }
    assert!(registries.parse_event("player fly").is_none());
}
