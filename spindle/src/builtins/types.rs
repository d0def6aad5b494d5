//! Built-in value types: number, string, boolean, entity, player, position.

use crate::host::{Entity, Player, Position, World};
use spindle_core::{ConversionError, FieldBag, ParseContext, RegistrationError, RenderFlags};
use spindle_std::types::{Parser, Serializer, TypeInfo, TypeRegistryBuilder};
use std::sync::Arc;
use uuid::Uuid;

pub(super) fn register(
    types: &mut TypeRegistryBuilder,
    world: &Arc<dyn World>,
    entity_names_in_scripts: bool,
) -> Result<(), RegistrationError> {
    types.register(
        TypeInfo::builder::<f64>("number")
            .display_name("Number")
            .description("A decimal number such as `3` or `-1.5`.")
            .parser(NumberParser)
            .serializer(ValueSerializer)
            .build(),
    )?;
    types.register(
        TypeInfo::builder::<String>("string")
            .display_name("Text")
            .description("Text, written in double quotes inside scripts.")
            .parser(StringParser)
            .serializer(ValueSerializer)
            .build(),
    )?;
    types.register(
        TypeInfo::builder::<bool>("boolean")
            .display_name("Boolean")
            .parser(BooleanParser)
            .serializer(ValueSerializer)
            .build(),
    )?;
    types.register(
        TypeInfo::builder::<Entity>("entity")
            .plural("entities")
            .display_name("Entity")
            .description("Any entity; in commands, a UUID or an online player's name.")
            .parser(EntityParser {
                world: Arc::clone(world),
                in_scripts: entity_names_in_scripts,
            })
            .event_value_default()
            .build(),
    )?;
    types.register(
        TypeInfo::builder::<Player>("player")
            .display_name("Player")
            .description("A connected player, by name or UUID.")
            .parser(PlayerParser {
                world: Arc::clone(world),
            })
            .event_value_default()
            .build(),
    )?;
    types.register(
        TypeInfo::builder::<Position>("position")
            .display_name("Position")
            .description("A location with facing; built with `position(x, y, z)`.")
            .parser(PositionParser)
            .serializer(PositionSerializer)
            .event_value_default()
            .build(),
    )?;

    types.converter::<Player, Entity, _>(|player| Some(player.entity().clone()));
    Ok(())
}

// ============================================================================
// Parsers
// ============================================================================

struct NumberParser;

impl Parser<f64> for NumberParser {
    fn parse(&self, text: &str, _context: ParseContext) -> Option<f64> {
        text.parse::<f64>().ok().filter(|n| n.is_finite())
    }

    fn render(&self, value: &f64, _flags: RenderFlags) -> String {
        value.to_string()
    }
}

struct StringParser;

impl Parser<String> for StringParser {
    fn parse(&self, text: &str, _context: ParseContext) -> Option<String> {
        Some(text.to_owned())
    }

    /// Bare text is a string only where no quoting exists.
    fn can_parse(&self, context: ParseContext) -> bool {
        matches!(context, ParseContext::Config | ParseContext::Parse)
    }

    fn render(&self, value: &String, flags: RenderFlags) -> String {
        if flags.contains(RenderFlags::QUOTED) {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.clone()
        }
    }
}

struct BooleanParser;

impl Parser<bool> for BooleanParser {
    fn parse(&self, text: &str, _context: ParseContext) -> Option<bool> {
        match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Some(true),
            "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    fn render(&self, value: &bool, _flags: RenderFlags) -> String {
        value.to_string()
    }
}

struct EntityParser {
    world: Arc<dyn World>,
    in_scripts: bool,
}

impl Parser<Entity> for EntityParser {
    fn parse(&self, text: &str, _context: ParseContext) -> Option<Entity> {
        match Uuid::parse_str(text) {
            Ok(id) => self.world.entity(id),
            Err(_) => self
                .world
                .player_by_name(text)
                .map(|player| player.entity().clone()),
        }
    }

    fn can_parse(&self, context: ParseContext) -> bool {
        match context {
            ParseContext::Command | ParseContext::Parse => true,
            ParseContext::Script => self.in_scripts,
            ParseContext::Config | ParseContext::Event => false,
        }
    }

    fn render(&self, value: &Entity, _flags: RenderFlags) -> String {
        value.name()
    }

    fn render_variable_name(&self, value: &Entity) -> String {
        format!("entity:{}", value.id())
    }
}

struct PlayerParser {
    world: Arc<dyn World>,
}

impl Parser<Player> for PlayerParser {
    fn parse(&self, text: &str, _context: ParseContext) -> Option<Player> {
        match Uuid::parse_str(text) {
            Ok(id) => self.world.player(id),
            Err(_) => self.world.player_by_name(text),
        }
    }

    fn can_parse(&self, context: ParseContext) -> bool {
        !matches!(context, ParseContext::Config | ParseContext::Event)
    }

    fn render(&self, value: &Player, _flags: RenderFlags) -> String {
        value.name()
    }

    fn render_variable_name(&self, value: &Player) -> String {
        value.id().to_string()
    }
}

/// Renders positions; they have no literal form.
struct PositionParser;

impl Parser<Position> for PositionParser {
    fn parse(&self, _text: &str, _context: ParseContext) -> Option<Position> {
        None
    }

    fn can_parse(&self, _context: ParseContext) -> bool {
        false
    }

    fn render(&self, value: &Position, flags: RenderFlags) -> String {
        if flags.contains(RenderFlags::DEBUG) {
            format!("{value:?}")
        } else {
            value.to_string()
        }
    }

    fn render_variable_name(&self, value: &Position) -> String {
        format!("{}:{}:{}", value.x, value.y, value.z)
    }
}

// ============================================================================
// Serializers
// ============================================================================

/// Stores a primitive under a single `value` field.
struct ValueSerializer;

impl<P> Serializer<P> for ValueSerializer
where
    P: spindle_core::Primitive + Clone + Default + Send + Sync + 'static,
{
    fn serialize(&self, value: &P) -> FieldBag {
        let mut fields = FieldBag::new();
        fields.put_primitive("value", value.clone());
        fields
    }

    fn deserialize(&self, fields: &FieldBag) -> Result<P, ConversionError> {
        fields.get_primitive("value")
    }

    fn instantiate(&self) -> Option<P> {
        Some(P::default())
    }
}

/// Writes exactly `x`, `y`, `z`, `yaw` and `pitch`.
///
/// Positions belong to a world that may be loading, so they are never
/// created blank and always deserialize on the tick thread.
struct PositionSerializer;

impl Serializer<Position> for PositionSerializer {
    fn serialize(&self, value: &Position) -> FieldBag {
        let mut fields = FieldBag::new();
        fields.put_primitive("x", value.x);
        fields.put_primitive("y", value.y);
        fields.put_primitive("z", value.z);
        fields.put_primitive("yaw", value.yaw);
        fields.put_primitive("pitch", value.pitch);
        fields
    }

    fn deserialize(&self, fields: &FieldBag) -> Result<Position, ConversionError> {
        Ok(Position {
            x: fields.get_primitive("x")?,
            y: fields.get_primitive("y")?,
            z: fields.get_primitive("z")?,
            yaw: fields.get_primitive("yaw")?,
            pitch: fields.get_primitive("pitch")?,
        })
    }

    fn deserialize_into(
        &self,
        target: &mut Position,
        fields: &FieldBag,
    ) -> Result<(), ConversionError> {
        // Validate everything before touching the target.
        let position = self.deserialize(fields)?;
        *target = position;
        Ok(())
    }

    fn can_be_instantiated(&self) -> bool {
        false
    }

    fn must_sync_deserialization(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_parse_finite_decimals_only() {
        let parser = NumberParser;
        assert_eq!(parser.parse("-1.5", ParseContext::Script), Some(-1.5));
        assert_eq!(parser.parse("64", ParseContext::Script), Some(64.0));
        assert_eq!(parser.parse("inf", ParseContext::Script), None);
        assert_eq!(parser.parse("ten", ParseContext::Script), None);
        assert_eq!(parser.render(&64.0, RenderFlags::empty()), "64");
    }

    #[test]
    fn strings_quote_on_request() {
        let parser = StringParser;
        assert!(!parser.can_parse(ParseContext::Script));
        assert_eq!(
            parser.render(&"say \"hi\"".to_owned(), RenderFlags::QUOTED),
            "\"say \"\"hi\"\"\""
        );
    }

    #[test]
    fn booleans_accept_common_spellings() {
        let parser = BooleanParser;
        assert_eq!(parser.parse("Yes", ParseContext::Config), Some(true));
        assert_eq!(parser.parse("off", ParseContext::Config), Some(false));
        assert_eq!(parser.parse("maybe", ParseContext::Config), None);
    }

    #[test]
    fn primitives_round_trip_through_a_single_field() {
        let bag = Serializer::<f64>::serialize(&ValueSerializer, &2.5);
        assert_eq!(bag.len(), 1);
        assert_eq!(Serializer::<f64>::deserialize(&ValueSerializer, &bag), Ok(2.5));
    }

    #[test]
    fn in_place_position_deserialization_keeps_the_target_on_error() {
        let mut target = Position::new(1.0, 2.0, 3.0);
        let mut partial = FieldBag::new();
        partial.put_primitive("x", 9.0f64);

        assert!(PositionSerializer.deserialize_into(&mut target, &partial).is_err());
        assert_eq!(target, Position::new(1.0, 2.0, 3.0));

        let full = PositionSerializer.serialize(&Position::new(4.0, 5.0, 6.0).facing(90.0, 0.0));
        PositionSerializer.deserialize_into(&mut target, &full).unwrap();
        assert_eq!(target, Position::new(4.0, 5.0, 6.0).facing(90.0, 0.0));
    }
}
