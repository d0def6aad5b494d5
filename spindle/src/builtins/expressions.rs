//! Built-in expressions.

use super::events::PlayerChat;
use crate::host::{Entity, Position};
use spindle_core::{EvalError, Expression, RegistrationError, ScriptEvent, TypeKey, Value};
use spindle_std::syntax::{ExpressionSyntax, ParseResult, SyntaxRegistryBuilder};

pub(super) fn register(syntax: &mut SyntaxRegistryBuilder) -> Result<(), RegistrationError> {
    syntax.expression::<PositionLiteral>(&[
        r"position\(%number%, %number%, %number%[, yaw=%number%][, pitch=%number%]\)",
    ])?;
    syntax.expression::<PositionOf>(&["[the] position of %entities%"])?;
    syntax.expression::<ChatMessage>(&["[the] [chat] message"])?;
    Ok(())
}

/// `position(x, y, z[, yaw=..][, pitch=..])`
#[derive(Debug)]
pub struct PositionLiteral {
    x: Box<dyn Expression>,
    y: Box<dyn Expression>,
    z: Box<dyn Expression>,
    yaw: Option<Box<dyn Expression>>,
    pitch: Option<Box<dyn Expression>>,
}

fn angle(expr: Option<&dyn Expression>, event: &dyn ScriptEvent) -> Result<f32, EvalError> {
    Ok(expr
        .map(|e| e.require::<f64>(event))
        .transpose()?
        .unwrap_or(0.0) as f32)
}

impl ExpressionSyntax for PositionLiteral {
    type Output = Position;

    fn init(mut result: ParseResult) -> Option<Self> {
        Some(Self {
            x: result.take(0)?,
            y: result.take(1)?,
            z: result.take(2)?,
            yaw: result.take(3),
            pitch: result.take(4),
        })
    }
}

impl Expression for PositionLiteral {
    fn return_type(&self) -> TypeKey {
        TypeKey::of::<Position>()
    }

    fn is_single(&self) -> bool {
        true
    }

    fn get_all(&self, event: &dyn ScriptEvent) -> Result<Vec<Value>, EvalError> {
        let position = Position {
            x: self.x.require::<f64>(event)?,
            y: self.y.require::<f64>(event)?,
            z: self.z.require::<f64>(event)?,
            yaw: angle(self.yaw.as_deref(), event)?,
            pitch: angle(self.pitch.as_deref(), event)?,
        };
        Ok(vec![Value::new(position)])
    }

    fn describe(&self) -> String {
        format!(
            "position({}, {}, {})",
            self.x.describe(),
            self.y.describe(),
            self.z.describe()
        )
    }
}

/// `[the] position of %entities%`
#[derive(Debug)]
pub struct PositionOf {
    entities: Box<dyn Expression>,
}

impl ExpressionSyntax for PositionOf {
    type Output = Position;

    fn init(mut result: ParseResult) -> Option<Self> {
        Some(Self {
            entities: result.take(0)?,
        })
    }
}

impl Expression for PositionOf {
    fn return_type(&self) -> TypeKey {
        TypeKey::of::<Position>()
    }

    fn is_single(&self) -> bool {
        self.entities.is_single()
    }

    fn get_all(&self, event: &dyn ScriptEvent) -> Result<Vec<Value>, EvalError> {
        Ok(self
            .entities
            .all::<Entity>(event)?
            .iter()
            .map(|entity| Value::new(entity.position()))
            .collect())
    }

    fn describe(&self) -> String {
        format!("the position of {}", self.entities.describe())
    }
}

/// `[the] [chat] message`, only inside chat events.
#[derive(Debug)]
pub struct ChatMessage;

impl ExpressionSyntax for ChatMessage {
    type Output = String;

    fn init(result: ParseResult) -> Option<Self> {
        (result.event == Some(TypeKey::of::<PlayerChat>())).then_some(Self)
    }
}

impl Expression for ChatMessage {
    fn return_type(&self) -> TypeKey {
        TypeKey::of::<String>()
    }

    fn is_single(&self) -> bool {
        true
    }

    fn get_all(&self, event: &dyn ScriptEvent) -> Result<Vec<Value>, EvalError> {
        Ok(event
            .downcast_ref::<PlayerChat>()
            .map(|chat| Value::new(chat.message().to_owned()))
            .into_iter()
            .collect())
    }

    fn describe(&self) -> String {
        "the message".to_owned()
    }
}
